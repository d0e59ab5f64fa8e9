//! Fan-out of one rendered notification across delivery channels.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::task::JoinSet;

use mb_domain::Channel;

use crate::{BoxFuture, Contact};

/// What to say, independent of channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Content {
	pub subject: String,
	pub body: String,
	pub html_body: Option<String>,
	/// Deep link into the app, when the notice concerns a suggestion.
	pub link: Option<String>,
}

/// One outbound delivery channel.
pub trait ChannelAdapter
where
	Self: Send + Sync,
{
	fn channel(&self) -> Channel;

	/// Whether the recipient has the contact details this channel needs.
	fn can_send_to(&self, recipient: &Contact) -> bool;

	/// Delivers `content` and returns the provider's reference for it.
	fn send<'a>(
		&'a self,
		recipient: &'a Contact,
		content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// A channel attempt that did not deliver. Reported, never retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
	pub channel: Channel,
	pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
	Sent { reference: String },
	Failed(DeliveryFailure),
	Skipped { reason: String },
}
impl DeliveryStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Sent { .. } => "SENT",
			Self::Failed(_) => "FAILED",
			Self::Skipped { .. } => "SKIPPED",
		}
	}

	pub fn detail(&self) -> Option<&str> {
		match self {
			Self::Sent { reference } if reference.is_empty() => None,
			Self::Sent { reference } => Some(reference),
			Self::Failed(failure) => Some(&failure.reason),
			Self::Skipped { reason } => Some(reason),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
	pub channel: Channel,
	pub status: DeliveryStatus,
}

pub struct NotificationDispatcher {
	adapters: Vec<Arc<dyn ChannelAdapter>>,
	timeout: Duration,
}
impl NotificationDispatcher {
	pub fn new(adapters: Vec<Arc<dyn ChannelAdapter>>, timeout: Duration) -> Self {
		Self { adapters, timeout }
	}

	pub fn channels(&self) -> Vec<Channel> {
		self.adapters.iter().map(|adapter| adapter.channel()).collect()
	}

	/// Attempts every requested channel concurrently. A failure, timeout, or panic in one
	/// channel never affects the others, and the call itself never fails.
	pub async fn dispatch(
		&self,
		recipient: &Contact,
		content: &Content,
		channels: &[Channel],
	) -> Vec<ChannelOutcome> {
		let mut requested: Vec<Channel> = Vec::with_capacity(channels.len());

		for channel in channels {
			if !requested.contains(channel) {
				requested.push(*channel);
			}
		}

		let mut outcomes: Vec<ChannelOutcome> = requested
			.iter()
			.map(|channel| ChannelOutcome {
				channel: *channel,
				status: DeliveryStatus::Failed(DeliveryFailure {
					channel: *channel,
					reason: "Channel task aborted.".to_string(),
				}),
			})
			.collect();
		let recipient = Arc::new(recipient.clone());
		let content = Arc::new(content.clone());
		let mut tasks = JoinSet::new();

		for (index, channel) in requested.iter().copied().enumerate() {
			let Some(adapter) = self.adapter(channel) else {
				outcomes[index].status =
					DeliveryStatus::Skipped { reason: "Channel is not configured.".to_string() };

				continue;
			};

			if !adapter.can_send_to(&recipient) {
				outcomes[index].status = DeliveryStatus::Skipped {
					reason: format!("Recipient has no {channel} contact details."),
				};

				continue;
			}

			let recipient = Arc::clone(&recipient);
			let content = Arc::clone(&content);
			let timeout = self.timeout;

			tasks.spawn(async move {
				let status = match tokio::time::timeout(timeout, adapter.send(&recipient, &content))
					.await
				{
					Ok(Ok(reference)) => DeliveryStatus::Sent { reference },
					Ok(Err(err)) =>
						DeliveryStatus::Failed(DeliveryFailure { channel, reason: err.to_string() }),
					Err(_) => DeliveryStatus::Failed(DeliveryFailure {
						channel,
						reason: format!("Timed out after {} ms.", timeout.as_millis()),
					}),
				};

				(index, status)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, status)) => outcomes[index].status = status,
				Err(err) => tracing::error!(error = %err, "Notification channel task panicked."),
			}
		}

		for outcome in &outcomes {
			if let DeliveryStatus::Failed(failure) = &outcome.status {
				tracing::warn!(
					recipient_id = %recipient.user_id,
					channel = %failure.channel,
					reason = %failure.reason,
					"Notification channel delivery failed."
				);
			}
		}

		outcomes
	}

	fn adapter(&self, channel: Channel) -> Option<Arc<dyn ChannelAdapter>> {
		self.adapters.iter().find(|adapter| adapter.channel() == channel).cloned()
	}
}
