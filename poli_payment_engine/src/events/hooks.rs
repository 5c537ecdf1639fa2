//! Subscriptions to the payment flow.
//!
//! Two things happen that other parts of the service care about: the host places an order, and a POLi payment gets
//! confirmed. Each event type can have any number of subscribers. Every subscriber gets its own channel and handler
//! task, so a slow subscriber never holds up the others.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderPlacedEvent, PaymentConfirmedEvent};

/// The publishing side, handed to [`crate::PaymentFlowApi`]. Cloning is cheap.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub payment_confirmed_producer: Vec<EventProducer<PaymentConfirmedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_placed(&self, ev: OrderPlacedEvent) {
        trace!("🪝️ Order {} placed. {} subscribers", ev.order.code, self.order_placed_producer.len());
        publish_to_all(&self.order_placed_producer, ev).await;
    }

    pub async fn publish_payment_confirmed(&self, ev: PaymentConfirmedEvent) {
        trace!("🪝️ Payment {} confirmed. {} subscribers", ev.payment.id, self.payment_confirmed_producer.len());
        publish_to_all(&self.payment_confirmed_producer, ev).await;
    }

    /// Adds the producers of another set of handlers, so that several integrations can listen to the same flow.
    pub fn merge(mut self, other: EventProducers) -> Self {
        self.order_placed_producer.extend(other.order_placed_producer);
        self.payment_confirmed_producer.extend(other.payment_confirmed_producer);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_placed_producer.is_empty() && self.payment_confirmed_producer.is_empty()
    }
}

async fn publish_to_all<E: Clone + Send + Sync>(producers: &[EventProducer<E>], ev: E) {
    for producer in producers {
        producer.publish_event(ev.clone()).await;
    }
}

/// The subscriber callbacks, before they are started.
#[derive(Default, Clone)]
pub struct EventHooks {
    order_placed: Vec<Handler<OrderPlacedEvent>>,
    payment_confirmed: Vec<Handler<PaymentConfirmedEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.order_placed.push(Arc::new(f));
        self
    }

    pub fn on_payment_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.payment_confirmed.push(Arc::new(f));
        self
    }
}

/// Channels and handler tasks for a set of hooks.
pub struct EventHandlers {
    order_placed: Vec<EventHandler<OrderPlacedEvent>>,
    payment_confirmed: Vec<EventHandler<PaymentConfirmedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let order_placed = hooks.order_placed.into_iter().map(|f| EventHandler::new(buffer_size, f)).collect();
        let payment_confirmed =
            hooks.payment_confirmed.into_iter().map(|f| EventHandler::new(buffer_size, f)).collect();
        Self { order_placed, payment_confirmed }
    }

    pub fn producers(&self) -> EventProducers {
        EventProducers {
            order_placed_producer: self.order_placed.iter().map(EventHandler::subscribe).collect(),
            payment_confirmed_producer: self.payment_confirmed.iter().map(EventHandler::subscribe).collect(),
        }
    }

    /// Spawns one task per subscriber. Each task runs until every producer for it has been dropped.
    pub async fn start_handlers(self) {
        debug!(
            "🪝️ Starting {} order-placed and {} payment-confirmed handlers",
            self.order_placed.len(),
            self.payment_confirmed.len()
        );
        for handler in self.order_placed {
            tokio::spawn(handler.start_handler());
        }
        for handler in self.payment_confirmed {
            tokio::spawn(handler.start_handler());
        }
    }
}
