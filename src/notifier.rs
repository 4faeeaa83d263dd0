//! Admin notifier: fans customer activity out to every admin through the
//! separate admin bot.
//!
//! The engine only enqueues events. A single worker drains the queue, so the
//! customer's reply never waits on admin delivery and notifications keep the
//! order in which they were raised.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html::escape;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bot::ui_builder::{format_money, format_quantity};
use crate::db::Storage;
use crate::localization::{t, t_args};
use crate::models::{MessageKind, OrderLine, UserProfile};

/// Something an admin needs to hear about
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    NewOrder {
        order_id: i64,
        customer: UserProfile,
        user_name: String,
        phone: String,
        city: String,
        np_department: String,
        items: Vec<OrderLine>,
        total: f64,
    },
    /// Quick order asking for a call back
    NewQuickOrder {
        order_id: i64,
        customer: UserProfile,
        product_name: String,
        phone: String,
    },
    /// Quick order header and the customer's text in one message
    QuickOrderWithMessage {
        order_id: i64,
        customer: UserProfile,
        product_name: String,
        text: String,
    },
    CustomerMessage {
        customer: UserProfile,
        kind: MessageKind,
        text: String,
    },
}

impl AdminEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AdminEvent::NewOrder { .. } => "new_order",
            AdminEvent::NewQuickOrder { .. } => "new_quick_order",
            AdminEvent::QuickOrderWithMessage { .. } => "quick_order_with_message",
            AdminEvent::CustomerMessage { .. } => "customer_message",
        }
    }

    pub fn customer(&self) -> &UserProfile {
        match self {
            AdminEvent::NewOrder { customer, .. }
            | AdminEvent::NewQuickOrder { customer, .. }
            | AdminEvent::QuickOrderWithMessage { customer, .. }
            | AdminEvent::CustomerMessage { customer, .. } => customer,
        }
    }
}

fn customer_line(customer: &UserProfile) -> String {
    let username = match customer.username.as_deref() {
        Some(name) if !name.is_empty() => format!("@{}", escape(name)),
        _ => t("admin-no-username"),
    };
    t_args(
        "admin-customer",
        &[
            ("name", &escape(&customer.display_name())),
            ("username", &username),
            ("user_id", &customer.user_id.to_string()),
        ],
    )
}

/// Render the HTML message admins receive for an event
pub fn render(event: &AdminEvent) -> String {
    let customer = customer_line(event.customer());
    match event {
        AdminEvent::NewOrder {
            order_id,
            user_name,
            phone,
            city,
            np_department,
            items,
            total,
            ..
        } => {
            let items = items
                .iter()
                .map(|line| {
                    format!(
                        "• {} × {} = {} грн",
                        escape(&line.product_name),
                        format_quantity(line.quantity),
                        format_money(line.line_total())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            t_args(
                "admin-new-order",
                &[
                    ("order_id", &order_id.to_string()),
                    ("customer", &format!("{customer}\n📝 {}", escape(user_name))),
                    ("phone", &escape(phone)),
                    ("city", &escape(city)),
                    ("depot", &escape(np_department)),
                    ("items", &items),
                    ("total", &format_money(*total)),
                ],
            )
        }
        AdminEvent::NewQuickOrder {
            order_id,
            product_name,
            phone,
            ..
        } => t_args(
            "admin-new-quick-order",
            &[
                ("order_id", &order_id.to_string()),
                ("customer", &customer),
                ("product", &escape(product_name)),
                ("phone", &escape(phone)),
            ],
        ),
        AdminEvent::QuickOrderWithMessage {
            order_id,
            product_name,
            text,
            ..
        } => t_args(
            "admin-quick-order-with-message",
            &[
                ("order_id", &order_id.to_string()),
                ("customer", &customer),
                ("product", &escape(product_name)),
                ("text", &escape(text)),
            ],
        ),
        AdminEvent::CustomerMessage { kind, text, .. } => t_args(
            "admin-customer-message",
            &[
                ("kind", &t(&format!("admin-kind-{}", kind.as_str()))),
                ("customer", &customer),
                ("text", &escape(text)),
            ],
        ),
    }
}

/// Outbound path to a single admin
#[async_trait]
pub trait AdminChannel: Send + Sync + 'static {
    async fn deliver(&self, admin_id: i64, text: &str) -> Result<()>;
}

/// Delivers through the admin bot identity
pub struct TelegramAdminChannel {
    bot: Bot,
}

impl TelegramAdminChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl AdminChannel for TelegramAdminChannel {
    async fn deliver(&self, admin_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(admin_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .with_context(|| format!("Failed to deliver admin notification to {admin_id}"))?;
        Ok(())
    }
}

/// Pending notifications the worker may fall behind by
pub const QUEUE_CAPACITY: usize = 1024;

/// Cloneable producer side held by the engine
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<AdminEvent>,
}

impl NotifierHandle {
    /// Create a handle and the receiver a worker (or a test) consumes
    pub fn channel() -> (Self, mpsc::Receiver<AdminEvent>) {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<AdminEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue an event without waiting. Returns false when it was dropped.
    pub fn notify(&self, event: AdminEvent) -> bool {
        let kind = event.kind();
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind, "Admin notification queue is full, dropping notification");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(kind, "Admin notifier is not running, dropping notification");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct AdminNotifier<S: Storage, C: AdminChannel> {
    store: Arc<S>,
    channel: C,
    pacing: Duration,
}

impl<S: Storage, C: AdminChannel> AdminNotifier<S, C> {
    pub fn new(store: Arc<S>, channel: C, pacing: Duration) -> Self {
        Self {
            store,
            channel,
            pacing,
        }
    }

    /// Deliver one event to every current admin, one after another.
    ///
    /// The admin list is read on every call. A failed delivery is logged and
    /// the remaining admins are still tried.
    pub async fn dispatch(&self, event: &AdminEvent) -> Result<DeliveryReport> {
        let admins = self
            .store
            .admin_ids()
            .await
            .context("Failed to load admin ids")?;
        if admins.is_empty() {
            warn!(kind = event.kind(), "No admins configured, notification not delivered");
            return Ok(DeliveryReport::default());
        }

        let text = render(event);
        let mut report = DeliveryReport::default();
        for (i, admin_id) in admins.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            match self.channel.deliver(*admin_id, &text).await {
                Ok(()) => {
                    debug!(admin_id, kind = event.kind(), "Admin notified");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(admin_id, kind = event.kind(), error = %e, "Admin delivery failed, skipping");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Drain the queue until every handle is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<AdminEvent>) {
        info!("Admin notifier started");
        while let Some(event) = rx.recv().await {
            match self.dispatch(&event).await {
                Ok(report) => debug!(
                    kind = event.kind(),
                    delivered = report.delivered,
                    failed = report.failed,
                    "Notification dispatched"
                ),
                Err(e) => error!(kind = event.kind(), error = %e, "Notification dispatch failed"),
            }
        }
        info!("Admin notifier stopped");
    }
}
