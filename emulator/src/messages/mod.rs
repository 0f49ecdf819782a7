//! `Messages` — §4.6. Renders and "delivers" a one-time code, optionally
//! through the **CustomMessage** trigger, to a pluggable
//! [`MessageDelivery`] sink.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared::errors::ApiResult;

use crate::context::Context;
use crate::domain::User;
use crate::triggers::{CustomMessageSource, Triggers};

/// Which channel §4.3.1 step 4 picked, or the channel a later flow
/// (MFA, forgot-password) always uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeliveryMedium {
    Sms,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDeliveryDetails {
    pub destination: String,
    pub delivery_medium: DeliveryMedium,
    pub attribute_name: String,
}

/// The external sink a rendered message is handed to. A trait so tests can
/// capture what would have been sent instead of actually sending it.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait MessageDelivery: Send + Sync {
    async fn send(&self, ctx: &Context, details: &CodeDeliveryDetails, message: &str) -> ApiResult<()>;
}

/// Default sink: logs the rendered message through `tracing` rather than
/// actually dispatching SMS/email, matching the teacher's convention of
/// routing user-facing side effects through structured log events instead
/// of `println!`.
pub struct LoggingMessageDelivery;

#[async_trait]
impl MessageDelivery for LoggingMessageDelivery {
    async fn send(&self, _ctx: &Context, details: &CodeDeliveryDetails, message: &str) -> ApiResult<()> {
        tracing::info!(
            destination = %mask(&details.destination),
            medium = ?details.delivery_medium,
            "{message}"
        );
        Ok(())
    }
}

fn mask(destination: &str) -> String {
    let visible = destination.len().min(2);
    format!("{}***", &destination[..visible])
}

pub struct Messages {
    triggers: Arc<Triggers>,
    delivery: Arc<dyn MessageDelivery>,
}

impl Messages {
    pub fn new(triggers: Arc<Triggers>, delivery: Arc<dyn MessageDelivery>) -> Self {
        Self { triggers, delivery }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn deliver(
        &self,
        ctx: &Context,
        source: CustomMessageSource,
        client_id: &str,
        user_pool_id: &str,
        user: &User,
        code: &str,
        client_metadata: Option<Value>,
        medium: DeliveryMedium,
        attribute_name: &str,
    ) -> ApiResult<CodeDeliveryDetails> {
        let destination = user
            .attribute(attribute_name)
            .map(|a| a.value.clone())
            .unwrap_or_default();

        let (sms_default, email_subject_default, email_default) = default_templates(source);

        let (sms_template, email_subject, email_template) = if self.triggers.enabled(crate::triggers::events::TriggerName::CustomMessage) {
            let custom = self
                .triggers
                .custom_message(ctx, source, client_id, user_pool_id, &user.username, &user.attributes, client_metadata)
                .await?;
            (
                custom.sms_message.unwrap_or_else(|| sms_default.to_string()),
                custom.email_subject.unwrap_or_else(|| email_subject_default.to_string()),
                custom.email_message.unwrap_or_else(|| email_default.to_string()),
            )
        } else {
            (sms_default.to_string(), email_subject_default.to_string(), email_default.to_string())
        };

        let rendered = match medium {
            DeliveryMedium::Sms => interpolate(&sms_template, code, &user.username),
            DeliveryMedium::Email => format!("{}\n\n{}", email_subject, interpolate(&email_template, code, &user.username)),
        };

        let details = CodeDeliveryDetails {
            destination,
            delivery_medium: medium,
            attribute_name: attribute_name.to_string(),
        };
        self.delivery.send(ctx, &details, &rendered).await?;
        Ok(details)
    }
}

fn interpolate(template: &str, code: &str, username: &str) -> String {
    template.replace("{####}", code).replace("{username}", username)
}

fn default_templates(source: CustomMessageSource) -> (&'static str, &'static str, &'static str) {
    match source {
        CustomMessageSource::SignUp | CustomMessageSource::AdminCreateUser | CustomMessageSource::ResendCode => (
            "Your verification code is {####}",
            "Your verification code",
            "Your username is {username} and verification code is {####}",
        ),
        CustomMessageSource::ForgotPassword => (
            "Your password reset code is {####}",
            "Your password reset code",
            "Your password reset code is {####}",
        ),
        CustomMessageSource::UpdateUserAttribute | CustomMessageSource::VerifyUserAttribute => (
            "Your attribute verification code is {####}",
            "Your attribute verification code",
            "Your attribute verification code is {####}",
        ),
        CustomMessageSource::Authentication => (
            "Your authentication code is {####}",
            "Your authentication code",
            "Your authentication code is {####}",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Attribute, UserStatus};
    use crate::triggers::lambda::MockLambda;

    fn user() -> User {
        User::new(
            "alice",
            "p",
            vec![Attribute::new("phone_number", "+15551234567")],
            UserStatus::Unconfirmed,
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn deliver_renders_default_template_when_no_custom_message_trigger() {
        let mut lambda_mock = MockLambda::new();
        lambda_mock.expect_is_configured().returning(|_| false);
        let triggers = Arc::new(Triggers::new(Arc::new(lambda_mock)));

        let mut delivery_mock = MockMessageDelivery::new();
        delivery_mock
            .expect_send()
            .withf(|_, details, message| {
                details.destination == "+15551234567" && message.contains("1234")
            })
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let messages = Messages::new(triggers, Arc::new(delivery_mock));
        let details = messages
            .deliver(
                &Context::new(),
                CustomMessageSource::SignUp,
                "client",
                "pool",
                &user(),
                "1234",
                None,
                DeliveryMedium::Sms,
                "phone_number",
            )
            .await
            .unwrap();
        assert_eq!(details.destination, "+15551234567");
    }
}
