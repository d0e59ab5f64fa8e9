//! Provider-backed [`ChannelAdapter`]s built from configuration.

use std::{sync::Arc, time::Duration};

use mb_config::{EmailChannelConfig, Notifications, PushChannelConfig, WhatsAppChannelConfig};
use mb_domain::Channel;
use mb_providers::{
	email::{self, EmailMessage},
	push::{self, PushMessage},
	whatsapp,
};

use crate::{BoxFuture, ChannelAdapter, Contact, Content, Error, NotificationDispatcher, Result};

pub struct EmailChannel {
	cfg: EmailChannelConfig,
	timeout: Duration,
}

pub struct WhatsAppChannel {
	cfg: WhatsAppChannelConfig,
	timeout: Duration,
}

pub struct PushChannel {
	cfg: PushChannelConfig,
	timeout: Duration,
}

impl ChannelAdapter for EmailChannel {
	fn channel(&self) -> Channel {
		Channel::Email
	}

	fn can_send_to(&self, recipient: &Contact) -> bool {
		recipient.email.contains('@')
	}

	fn send<'a>(
		&'a self,
		recipient: &'a Contact,
		content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let message = EmailMessage {
				to: recipient.email.clone(),
				to_name: recipient.display_name.clone(),
				subject: content.subject.clone(),
				text: content.body.clone(),
				html: content.html_body.clone(),
			};

			email::send_email(&self.cfg, &message, self.timeout).await
		})
	}
}

impl ChannelAdapter for WhatsAppChannel {
	fn channel(&self) -> Channel {
		Channel::Whatsapp
	}

	fn can_send_to(&self, recipient: &Contact) -> bool {
		recipient
			.phone
			.as_deref()
			.map(|phone| whatsapp::is_e164(&whatsapp::normalize_phone(phone)))
			.unwrap_or(false)
	}

	fn send<'a>(
		&'a self,
		recipient: &'a Contact,
		content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let phone = recipient.phone.as_deref().unwrap_or_default();
			let body = match content.link.as_deref() {
				Some(link) => format!("*{}*\n\n{}\n\n{link}", content.subject, content.body),
				None => format!("*{}*\n\n{}", content.subject, content.body),
			};

			whatsapp::send_whatsapp(&self.cfg, phone, &body, self.timeout).await
		})
	}
}

impl ChannelAdapter for PushChannel {
	fn channel(&self) -> Channel {
		Channel::Push
	}

	fn can_send_to(&self, recipient: &Contact) -> bool {
		recipient.push_token.as_deref().map(push::is_push_token).unwrap_or(false)
	}

	fn send<'a>(
		&'a self,
		recipient: &'a Contact,
		content: &'a Content,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let message = PushMessage {
				to: recipient.push_token.clone().unwrap_or_default(),
				title: content.subject.clone(),
				body: content.body.clone(),
				data: serde_json::json!({ "link": content.link }),
			};

			push::send_push(&self.cfg, &message, self.timeout).await
		})
	}
}

impl NotificationDispatcher {
	/// Builds a dispatcher with one provider-backed adapter per enabled channel.
	pub fn from_config(cfg: &Notifications) -> Result<Self> {
		let timeout = Duration::from_millis(cfg.channel_timeout_ms);
		let mut adapters: Vec<Arc<dyn ChannelAdapter>> = Vec::with_capacity(cfg.channels.len());

		for name in &cfg.channels {
			let channel: Channel = name.parse().map_err(|_| Error::InvalidRequest {
				message: format!("Unknown notification channel {name:?}."),
			})?;
			let adapter: Arc<dyn ChannelAdapter> = match channel {
				Channel::Email => Arc::new(EmailChannel {
					cfg: required(cfg.email.as_ref(), "email")?.clone(),
					timeout,
				}),
				Channel::Whatsapp => Arc::new(WhatsAppChannel {
					cfg: required(cfg.whatsapp.as_ref(), "whatsapp")?.clone(),
					timeout,
				}),
				Channel::Push => Arc::new(PushChannel {
					cfg: required(cfg.push.as_ref(), "push")?.clone(),
					timeout,
				}),
			};

			adapters.push(adapter);
		}

		Ok(Self::new(adapters, timeout))
	}
}

fn required<'a, T>(section: Option<&'a T>, name: &str) -> Result<&'a T> {
	section.ok_or_else(|| Error::InvalidRequest {
		message: format!("notifications.{name} must be configured when the channel is enabled."),
	})
}

#[cfg(test)]
mod tests {
	use serde_json::Map;
	use uuid::Uuid;

	use mb_domain::Role;

	use super::*;

	fn contact(email: &str, phone: Option<&str>, push_token: Option<&str>) -> Contact {
		Contact {
			user_id: Uuid::new_v4(),
			role: Role::Candidate,
			display_name: "Noa".to_string(),
			email: email.to_string(),
			phone: phone.map(ToString::to_string),
			push_token: push_token.map(ToString::to_string),
		}
	}

	fn notifications(channels: &[&str]) -> Notifications {
		Notifications {
			channels: channels.iter().map(ToString::to_string).collect(),
			channel_timeout_ms: 5_000,
			email: Some(EmailChannelConfig {
				api_base: "https://mail.example".to_string(),
				path: "/send".to_string(),
				api_key: "key".to_string(),
				from_address: "noreply@matchbook.test".to_string(),
				default_headers: Map::new(),
			}),
			whatsapp: None,
			push: None,
		}
	}

	#[test]
	fn eligibility_follows_contact_details() {
		let timeout = Duration::from_secs(5);
		let whatsapp = WhatsAppChannel {
			cfg: WhatsAppChannelConfig {
				api_base: "https://api.twilio.com".to_string(),
				account_sid: "AC1".to_string(),
				auth_token: "t".to_string(),
				from_number: "+15550000000".to_string(),
			},
			timeout,
		};
		let push = PushChannel {
			cfg: PushChannelConfig {
				api_base: "https://exp.host".to_string(),
				path: "/--/api/v2/push/send".to_string(),
				access_token: None,
			},
			timeout,
		};

		assert!(whatsapp.can_send_to(&contact("a@b.test", Some("+1 555 010 0000"), None)));
		assert!(!whatsapp.can_send_to(&contact("a@b.test", Some("0555"), None)));
		assert!(!whatsapp.can_send_to(&contact("a@b.test", None, None)));
		assert!(push.can_send_to(&contact("a@b.test", None, Some("ExponentPushToken[x]"))));
		assert!(!push.can_send_to(&contact("a@b.test", None, None)));
	}

	#[test]
	fn builds_only_enabled_channels() {
		let dispatcher =
			NotificationDispatcher::from_config(&notifications(&["email"])).expect("Build failed.");

		assert_eq!(dispatcher.channels(), vec![Channel::Email]);
	}

	#[test]
	fn enabled_channel_without_section_is_rejected() {
		assert!(NotificationDispatcher::from_config(&notifications(&["email", "push"])).is_err());
	}
}
