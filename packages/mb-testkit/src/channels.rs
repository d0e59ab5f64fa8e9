//! Scripted [`ChannelAdapter`]s for dispatcher and worker tests.

use std::{
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use color_eyre::eyre;
use uuid::Uuid;

use mb_domain::Channel;
use mb_service::{BoxFuture, ChannelAdapter, Contact, Content};

/// Accepts everything and remembers what it was asked to send.
pub struct RecordingChannel {
	channel: Channel,
	sent: Mutex<Vec<(Uuid, Content)>>,
}
impl RecordingChannel {
	pub fn new(channel: Channel) -> Self {
		Self { channel, sent: Mutex::new(Vec::new()) }
	}

	pub fn sent(&self) -> Vec<(Uuid, Content)> {
		self.sent.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

impl ChannelAdapter for RecordingChannel {
	fn channel(&self) -> Channel {
		self.channel
	}

	fn can_send_to(&self, _recipient: &Contact) -> bool {
		true
	}

	fn send<'a>(
		&'a self,
		recipient: &'a Contact,
		content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let mut sent = self.sent.lock().unwrap_or_else(|err| err.into_inner());

			sent.push((recipient.user_id, content.clone()));

			Ok(format!("{}-{}", self.channel, sent.len()))
		})
	}
}

/// Fails every attempt with a fixed reason.
pub struct FailingChannel {
	channel: Channel,
	reason: String,
	attempts: AtomicUsize,
}
impl FailingChannel {
	pub fn new(channel: Channel, reason: &str) -> Self {
		Self { channel, reason: reason.to_string(), attempts: AtomicUsize::new(0) }
	}

	pub fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}
}

impl ChannelAdapter for FailingChannel {
	fn channel(&self) -> Channel {
		self.channel
	}

	fn can_send_to(&self, _recipient: &Contact) -> bool {
		true
	}

	fn send<'a>(
		&'a self,
		_recipient: &'a Contact,
		_content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			self.attempts.fetch_add(1, Ordering::SeqCst);

			Err(eyre::eyre!("{}", self.reason))
		})
	}
}

/// Never answers within any sane timeout.
pub struct StalledChannel {
	channel: Channel,
}
impl StalledChannel {
	pub fn new(channel: Channel) -> Self {
		Self { channel }
	}
}

impl ChannelAdapter for StalledChannel {
	fn channel(&self) -> Channel {
		self.channel
	}

	fn can_send_to(&self, _recipient: &Contact) -> bool {
		true
	}

	fn send<'a>(
		&'a self,
		_recipient: &'a Contact,
		_content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			tokio::time::sleep(Duration::from_secs(3_600)).await;

			Ok(String::new())
		})
	}
}
