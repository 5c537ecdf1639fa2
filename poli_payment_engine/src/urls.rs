//! Absolute URLs for the buyer-facing pages and the gateway callbacks.
//!
//! The return, cancel and webhook routes are mounted under `/{organizer}/{event}/poli/`. Order pages belong to the
//! host and live at `/{organizer}/{event}/order/{code}/{secret}/`.
use crate::db_types::{Event, Order};

/// Notice keys appended to redirects so the host can show the buyer a message.
pub mod notices {
    pub const PAYMENT_SUCCESS: &str = "poli_success";
    pub const PAYMENT_PROCESSING: &str = "poli_processing";
    pub const PAYMENT_FAILED: &str = "poli_failed";
    pub const PAYMENT_CANCELLED: &str = "poli_cancelled";
    pub const PAYMENT_UNVERIFIED: &str = "poli_unverified";
    pub const ORDER_NOT_FOUND: &str = "poli_order_not_found";
    pub const PAYMENT_NOT_FOUND: &str = "poli_payment_not_found";
    pub const PROCESSING_ERROR: &str = "poli_error";
    /// Sent as `error=` rather than `notice=`.
    pub const NO_TOKEN: &str = "poli_no_token";
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    site_url: String,
}

impl UrlBuilder {
    pub fn new<S: AsRef<str>>(site_url: S) -> Self {
        Self { site_url: site_url.as_ref().trim_end_matches('/').to_string() }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn event_index(&self, event: &Event) -> String {
        format!("{}/{}/{}/", self.site_url, event.organizer, event.slug)
    }

    pub fn event_index_with_notice(&self, event: &Event, notice: &str) -> String {
        format!("{}?notice={notice}", self.event_index(event))
    }

    pub fn order_page(&self, event: &Event, code: &str, secret: &str) -> String {
        format!("{}order/{code}/{secret}/", self.event_index(event))
    }

    /// The order page, opened, with a notice for the buyer.
    pub fn order_page_with_notice(&self, event: &Event, order: &Order, notice: &str) -> String {
        format!("{}?opened&notice={notice}", self.order_page(event, order.code.as_str(), &order.secret))
    }

    pub fn order_page_with_error(&self, event: &Event, code: &str, secret: &str, error: &str) -> String {
        format!("{}?error={error}", self.order_page(event, code, secret))
    }

    pub fn return_url(&self, event: &Event, order: &Order, payment_id: i64) -> String {
        format!("{}poli/return/{}/{payment_id}/{}/", self.event_index(event), order.code, order.secret)
    }

    pub fn cancel_url(&self, event: &Event, order: &Order, payment_id: i64) -> String {
        format!("{}poli/cancel/{}/{payment_id}/{}/", self.event_index(event), order.code, order.secret)
    }

    pub fn webhook_url(&self, event: &Event) -> String {
        format!("{}poli/webhook", self.event_index(event))
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{Amount, OrderCode, OrderStatus};

    fn fixtures() -> (Event, Order) {
        let event = Event {
            id: 1,
            organizer: "acme".into(),
            slug: "gala24".into(),
            name: "Gala".into(),
            currency: "NZD".into(),
            created_at: Utc::now(),
        };
        let order = Order {
            id: 3,
            event_id: 1,
            code: OrderCode::from("ABC12"),
            secret: "s3cr3t".into(),
            status: OrderStatus::Pending,
            total: Amount::from_cents(1000),
            email: None,
            locale: None,
            require_approval: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        (event, order)
    }

    #[test]
    fn callback_urls() {
        let (event, order) = fixtures();
        let urls = UrlBuilder::new("https://tix.example/");
        assert_eq!(urls.event_index(&event), "https://tix.example/acme/gala24/");
        assert_eq!(urls.return_url(&event, &order, 7), "https://tix.example/acme/gala24/poli/return/ABC12/7/s3cr3t/");
        assert_eq!(urls.cancel_url(&event, &order, 7), "https://tix.example/acme/gala24/poli/cancel/ABC12/7/s3cr3t/");
        assert_eq!(urls.webhook_url(&event), "https://tix.example/acme/gala24/poli/webhook");
        assert_eq!(
            urls.order_page_with_notice(&event, &order, notices::PAYMENT_SUCCESS),
            "https://tix.example/acme/gala24/order/ABC12/s3cr3t/?opened&notice=poli_success"
        );
        assert_eq!(
            urls.order_page_with_error(&event, "ABC12", "s3cr3t", notices::NO_TOKEN),
            "https://tix.example/acme/gala24/order/ABC12/s3cr3t/?error=poli_no_token"
        );
    }
}
