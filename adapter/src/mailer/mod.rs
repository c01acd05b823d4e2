use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use kernel::notifier::{Notification, NotificationKind, Notifier};
use reqwest::Client;
use shared::{
    config::MailConfig,
    error::{AppError, AppResult},
};
use sqlx::FromRow;
use tokio::sync::mpsc;

use crate::database::ConnectionPool;

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const QUEUE_CAPACITY: usize = 256;

#[derive(FromRow)]
struct RecipientRow {
    user_name: String,
    email: String,
    event_name: String,
}

/// 通知のキュー投入口。配送はバックグラウンドのワーカーが担う
#[derive(Clone)]
pub struct MailNotifier {
    tx: mpsc::Sender<Notification>,
}

impl MailNotifier {
    pub fn spawn(db: ConnectionPool, config: MailConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Notification>(QUEUE_CAPACITY);
        let worker = MailWorker {
            db,
            config,
            client: Client::new(),
        };

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                if let Err(e) = worker.deliver(notification).await {
                    tracing::warn!(
                        user_id = %notification.user_id,
                        event_id = %notification.event_id,
                        error = %e,
                        "通知メールの配送に失敗しました"
                    );
                }
            }
        });

        Self { tx }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&self, notification: Notification) -> AppResult<()> {
        self.tx
            .send(notification)
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("mail queue closed: {e}")))
    }
}

struct MailWorker {
    db: ConnectionPool,
    config: MailConfig,
    client: Client,
}

impl MailWorker {
    async fn deliver(&self, notification: Notification) -> AppResult<()> {
        let row: Option<RecipientRow> = sqlx::query_as(
            r#"
                SELECT u.user_name, u.email, e.event_name
                FROM users u
                CROSS JOIN events e
                WHERE u.user_id = $1 AND e.event_id = $2
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.event_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            // 配送前に利用者やイベントが消えた場合は送らない
            return Ok(());
        };

        let (subject, body_text) = match notification.kind {
            NotificationKind::Registered => (
                format!("参加登録完了：{}", row.event_name),
                format!(
                    "{}さん\n\nイベント「{}」への参加登録が完了しました。\n当日のご参加をお待ちしています。",
                    row.user_name, row.event_name
                ),
            ),
            NotificationKind::Promoted => (
                format!("繰り上げ登録のお知らせ：{}", row.event_name),
                format!(
                    "{}さん\n\nキャンセルが発生したため、イベント「{}」のキャンセル待ちから参加登録へ繰り上がりました。",
                    row.user_name, row.event_name
                ),
            ),
        };

        let (Some(sender), Some(access_token)) =
            (self.config.sender.as_deref(), self.config.access_token.as_deref())
        else {
            // メール未設定の環境では内容をログに残すだけ
            tracing::info!(
                to = %row.email,
                subject = %subject,
                "メール設定がないため通知はログ出力のみ"
            );
            return Ok(());
        };

        let message_str = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{}",
            sender,
            row.email,
            encode_subject(&subject),
            body_text
        );
        let encoded_message = general_purpose::URL_SAFE_NO_PAD.encode(message_str.as_bytes());

        let res = self
            .client
            .post(GMAIL_SEND_URL)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": encoded_message }))
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Gmail error: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "Gmail 送信失敗 ({status}): {text}"
            )));
        }

        Ok(())
    }
}

/// Subject ヘッダに非 ASCII を直接書けないため、RFC 2047 の B エンコードにする
fn encode_subject(subject: &str) -> String {
    format!(
        "=?UTF-8?B?{}?=",
        general_purpose::STANDARD.encode(subject.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_header_is_b_encoded_ascii() {
        let encoded = encode_subject("参加登録完了：夏祭り");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
        assert!(encoded.is_ascii());
    }
}
