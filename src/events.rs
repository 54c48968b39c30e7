use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Domain events emitted after successful writes. Delivery is best-effort:
/// a full or closed channel never fails the operation that produced the
/// event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseOrderCreated {
        po_id: String,
        supplier_id: String,
    },
    PurchaseOrderStatusChanged {
        po_id: String,
        old_status: String,
        new_status: String,
    },
    StockTransactionPosted {
        transaction_id: String,
        tx_type: String,
        line_count: usize,
    },
    ProductCreated {
        product_id: String,
    },
    SupplierCreated {
        supplier_id: String,
    },
    UserCreated {
        user_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging (not propagating) delivery failure.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            debug!("event channel closed, dropping event: {}", e);
        }
    }
}

/// Background consumer for the event channel. Currently logs each event;
/// notification fan-out would hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PurchaseOrderCreated { po_id, supplier_id } => {
                info!(%po_id, %supplier_id, "purchase order created");
            }
            Event::PurchaseOrderStatusChanged {
                po_id,
                old_status,
                new_status,
            } => {
                info!(%po_id, %old_status, %new_status, "purchase order status changed");
            }
            Event::StockTransactionPosted {
                transaction_id,
                tx_type,
                line_count,
            } => {
                info!(%transaction_id, %tx_type, line_count, "stock transaction posted");
            }
            Event::ProductCreated { product_id } => {
                info!(%product_id, "product created");
            }
            Event::SupplierCreated { supplier_id } => {
                info!(%supplier_id, "supplier created");
            }
            Event::UserCreated { user_id } => {
                info!(%user_id, "user created");
            }
        }
    }
    debug!("event channel drained, processor exiting");
}
