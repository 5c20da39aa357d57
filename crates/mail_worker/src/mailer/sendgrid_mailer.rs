use crate::http::{http_client, transport_error, unexpected_status};
use async_trait::async_trait;
use common::domain::{ConnectorError, ConnectorResult, EmailMessage, Mailer};
use reqwest::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Identity every email is sent from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<Address<'a>>,
    dynamic_template_data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    template_id: &'a str,
    from: &'a Sender,
}

/// SendGrid v3 mail-send client. Configured CC addresses are added as BCC.
#[derive(Clone)]
pub struct SendGridMailer {
    url: String,
    sender: Sender,
    cc: Vec<String>,
    client: reqwest::Client,
}

impl SendGridMailer {
    /// `cc` is a comma-separated list; blanks and duplicates are dropped.
    pub fn new(
        url: impl Into<String>,
        sender: Sender,
        cc: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            sender,
            cc: parse_cc(cc),
            client: http_client(timeout)?,
        })
    }

    /// CC addresses for a message, minus anyone already in `to`.
    fn bcc_for<'a>(&'a self, to: &[String]) -> Vec<Address<'a>> {
        self.cc
            .iter()
            .filter(|cc| !to.iter().any(|recipient| recipient.eq_ignore_ascii_case(cc)))
            .map(|cc| Address { email: cc.as_str() })
            .collect()
    }
}

fn parse_cc(cc: &str) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for address in cc.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !unique.iter().any(|known| known.eq_ignore_ascii_case(address)) {
            unique.push(address.to_string());
        }
    }
    unique
}

#[async_trait]
impl Mailer for SendGridMailer {
    #[instrument(skip(self, message, credential), fields(template_id = %message.template_id, recipients = message.to.len()))]
    async fn send(&self, message: &EmailMessage, credential: &str) -> ConnectorResult<()> {
        if message.to.is_empty() {
            return Err(ConnectorError::NoRecipients);
        }

        let request = MailSendRequest {
            personalizations: [Personalization {
                to: message
                    .to
                    .iter()
                    .map(|email| Address {
                        email: email.as_str(),
                    })
                    .collect(),
                bcc: self.bcc_for(&message.to),
                dynamic_template_data: &message.dynamic_data,
            }],
            template_id: &message.template_id,
            from: &self.sender,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED => {
                debug!("email accepted");
                Ok(())
            }
            _ => Err(unexpected_status(response).await),
        }
    }
}
