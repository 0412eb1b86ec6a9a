use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use super::notifier::{Notification, Notifier, NotifyError};
use super::payment::{CreateOrderRequest, OrderData, PaymentProvider, ProviderError, ProviderResult};

/// Mock payment provider that records calls and returns scripted results
#[derive(Debug, Clone)]
pub struct MockProvider {
    create_calls: Arc<Mutex<Vec<CreateOrderRequest>>>,
    ref_calls: Arc<Mutex<Vec<(String, String)>>>,
    create_result: ProviderResult,
    status_result: ProviderResult,
    cancel_result: ProviderResult,
    health_result: ProviderResult,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::succeeding("mock-order")
    }
}

impl MockProvider {
    /// Every call succeeds with an order id
    pub fn succeeding(order_id: &str) -> Self {
        Self {
            create_calls: Arc::new(Mutex::new(Vec::new())),
            ref_calls: Arc::new(Mutex::new(Vec::new())),
            create_result: Ok(OrderData::with_status(order_id, "pending")),
            status_result: Ok(OrderData::with_status(order_id, "pending")),
            cancel_result: Ok(OrderData::with_status(order_id, "canceled")),
            health_result: Ok(OrderData::with_status("", "ok")),
        }
    }

    /// Every call is rejected with the given message
    pub fn failing(message: &str) -> Self {
        let err = Err(ProviderError::rejected(message));
        Self {
            create_result: err.clone(),
            status_result: err.clone(),
            cancel_result: err.clone(),
            health_result: err,
            ..Self::succeeding("")
        }
    }

    /// Builder method to script the status response
    pub fn with_status(mut self, result: ProviderResult) -> Self {
        self.status_result = result;
        self
    }

    /// Builder method to script the health response
    pub fn with_health(mut self, result: ProviderResult) -> Self {
        self.health_result = result;
        self
    }

    /// Get all recorded create_order calls
    pub fn create_calls(&self) -> Vec<CreateOrderRequest> {
        self.create_calls.lock().unwrap().clone()
    }

    /// Get all recorded (method, order_ref) calls for status/cancel/health
    pub fn ref_calls(&self) -> Vec<(String, String)> {
        self.ref_calls.lock().unwrap().clone()
    }

    /// Total number of calls of any kind
    pub fn call_count(&self) -> usize {
        self.create_calls.lock().unwrap().len() + self.ref_calls.lock().unwrap().len()
    }

    fn record(&self, method: &str, order_ref: &str) {
        self.ref_calls
            .lock()
            .unwrap()
            .push((method.to_string(), order_ref.to_string()));
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_order(&self, request: &CreateOrderRequest) -> ProviderResult {
        self.create_calls.lock().unwrap().push(request.clone());
        self.create_result.clone()
    }

    async fn get_status(&self, order_ref: &str) -> ProviderResult {
        self.record("status", order_ref);
        self.status_result.clone()
    }

    async fn cancel(&self, order_ref: &str) -> ProviderResult {
        self.record("cancel", order_ref);
        self.cancel_result.clone()
    }

    async fn health_check(&self) -> ProviderResult {
        self.record("health", "");
        self.health_result.clone()
    }
}

/// Notifier that keeps every notification it was asked to deliver
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
