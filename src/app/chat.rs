use serde::Serialize;

use super::listings::listing_visible_to;
use super::{App, AppError};
use crate::db::{self, ConversationRecord, MessageRecord, UserRecord};
use crate::ids::new_id;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub mine: bool,
    pub body: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl MessageView {
    fn new(value: MessageRecord, viewer_id: &str) -> Self {
        Self {
            mine: value.sender_id == viewer_id,
            id: value.id,
            conversation_id: value.conversation_id,
            sender_id: value.sender_id,
            body: value.body,
            created_at: value.created_at,
            read_at: value.read_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InboxEntry {
    pub conversation_id: String,
    pub listing_id: String,
    pub listing_number: String,
    pub listing_title: String,
    pub role: &'static str,
    pub last_message: Option<String>,
    pub unread: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversationView {
    pub id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub messages: Vec<MessageView>,
    pub marked_read: usize,
}

impl App {
    /// Opens, or reuses, the buyer's conversation with the seller of a listing.
    pub fn send_message(&self, reference: &str, body: &str) -> Result<MessageView, AppError> {
        let buyer = self.require_writer()?;
        let listing = self.find_listing(reference)?;
        if !listing.status.is_public() {
            // Owners and admins may see it, but nobody can open a new thread on it.
            let key = reference.trim().to_string();
            return Err(if listing_visible_to(&listing, Some(&buyer)) {
                AppError::Conflict(format!(
                    "listing {} is {} and not open for messages",
                    listing.number, listing.status
                ))
            } else {
                AppError::NotFound {
                    kind: "listing",
                    key,
                }
            });
        }
        if listing.owner_id == buyer.id {
            return Err(AppError::InvalidArgument(
                "sellers cannot open a conversation on their own listing".to_string(),
            ));
        }
        let body = self.checked_body(body)?;

        let now = self.now_ts();
        let tx = self.conn.unchecked_transaction()?;
        let conversation = match db::find_conversation(&tx, &listing.id, &buyer.id)? {
            Some(existing) => existing,
            None => {
                let conversation = ConversationRecord {
                    id: new_id("V"),
                    listing_id: listing.id.clone(),
                    buyer_id: buyer.id.clone(),
                    seller_id: listing.owner_id.clone(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };
                db::insert_conversation(&tx, &conversation)?;
                tracing::info!(conversation = %conversation.id, listing = %listing.id, "conversation opened");
                conversation
            }
        };
        let message = MessageRecord {
            id: new_id("M"),
            conversation_id: conversation.id.clone(),
            sender_id: buyer.id.clone(),
            body,
            created_at: now,
            read_at: None,
        };
        db::insert_message(&tx, &message)?;
        tx.commit()?;
        tracing::info!(conversation = %message.conversation_id, message = %message.id, "message sent");
        Ok(MessageView::new(message, &buyer.id))
    }

    pub fn reply(&self, conversation_id: &str, body: &str) -> Result<MessageView, AppError> {
        let user = self.require_writer()?;
        let conversation = self.participant_conversation(conversation_id, &user)?;
        let body = self.checked_body(body)?;
        let message = MessageRecord {
            id: new_id("M"),
            conversation_id: conversation.id.clone(),
            sender_id: user.id.clone(),
            body,
            created_at: self.now_ts(),
            read_at: None,
        };
        let tx = self.conn.unchecked_transaction()?;
        db::insert_message(&tx, &message)?;
        tx.commit()?;
        tracing::info!(conversation = %conversation.id, message = %message.id, "reply sent");
        Ok(MessageView::new(message, &user.id))
    }

    pub fn inbox(&self) -> Result<Vec<InboxEntry>, AppError> {
        let user = self.require_session()?;
        Ok(db::list_inbox(&self.conn, &user.id)?
            .into_iter()
            .map(|row| InboxEntry {
                role: if row.conversation.seller_id == user.id {
                    "seller"
                } else {
                    "buyer"
                },
                conversation_id: row.conversation.id,
                listing_id: row.conversation.listing_id,
                listing_number: row.listing_number,
                listing_title: row.listing_title,
                last_message: row.last_message,
                unread: row.unread,
                updated_at: row.conversation.updated_at,
            })
            .collect())
    }

    /// Messages in order; the other party's unread messages become read.
    pub fn read_conversation(&self, conversation_id: &str) -> Result<ConversationView, AppError> {
        let user = self.require_session()?;
        let conversation = self.participant_conversation(conversation_id, &user)?;
        let marked_read =
            db::mark_messages_read(&self.conn, &conversation.id, &user.id, &self.now_ts())?;
        let messages = db::list_messages(&self.conn, &conversation.id)?
            .into_iter()
            .map(|message| MessageView::new(message, &user.id))
            .collect();
        Ok(ConversationView {
            id: conversation.id,
            listing_id: conversation.listing_id,
            buyer_id: conversation.buyer_id,
            seller_id: conversation.seller_id,
            messages,
            marked_read,
        })
    }

    fn participant_conversation(
        &self,
        conversation_id: &str,
        user: &UserRecord,
    ) -> Result<ConversationRecord, AppError> {
        let key = conversation_id.trim();
        let conversation = db::get_conversation(&self.conn, key)?.ok_or_else(|| {
            AppError::NotFound {
                kind: "conversation",
                key: key.to_string(),
            }
        })?;
        if conversation.buyer_id != user.id && conversation.seller_id != user.id {
            return Err(AppError::Forbidden(
                "only the buyer and seller can use this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    fn checked_body(&self, raw: &str) -> Result<String, AppError> {
        let body = raw.trim();
        if body.is_empty() {
            return Err(AppError::InvalidArgument(
                "message body cannot be empty".to_string(),
            ));
        }
        let limit = self.config.chat.max_message_len as usize;
        if body.chars().count() > limit {
            return Err(AppError::InvalidArgument(format!(
                "message body is longer than {limit} characters"
            )));
        }
        Ok(body.to_string())
    }
}
