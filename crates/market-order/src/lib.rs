//! Order lifecycle module for the marketplace system.
//!
//! This module owns the order entity's status machine: creation against the
//! catalog, payment reporting and chain verification, seller confirmation
//! with auto-delivery short-circuit, completion, cancellation, and the
//! hold/release hooks the refund workflow drives. All collaborators are
//! injected traits; persistence goes through a per-order-locked store.

pub mod service;
pub mod store;

pub use service::OrderService;
pub use store::OrderStore;

#[cfg(test)]
mod tests {
	use crate::{OrderService, OrderStore};
	use async_trait::async_trait;
	use chrono::Utc;
	use market_catalog::ProductCatalog;
	use market_notification::NotificationSink;
	use market_storage::{MemoryStorage, StorageService};
	use market_types::{
		DeliveryType, MarketError, OrderId, OrderStatus, Product, ProductId, ProductStatus,
		Result, TransactionVerification, UserId,
	};
	use market_verification::PaymentVerifier;
	use rust_decimal::Decimal;
	use std::collections::HashMap;
	use std::sync::Arc;
	use std::sync::Mutex;

	const BUYER: UserId = 10;
	const SELLER: UserId = 20;

	struct StaticCatalog {
		products: HashMap<ProductId, Product>,
	}

	#[async_trait]
	impl ProductCatalog for StaticCatalog {
		async fn get_product(&self, id: ProductId) -> Result<Product> {
			self.products
				.get(&id)
				.cloned()
				.ok_or_else(|| MarketError::not_found("Product not found"))
		}
	}

	struct StubVerifier {
		outcome: Mutex<TransactionVerification>,
	}

	impl StubVerifier {
		fn set(&self, outcome: TransactionVerification) {
			*self.outcome.lock().unwrap() = outcome;
		}
	}

	#[async_trait]
	impl PaymentVerifier for StubVerifier {
		async fn verify(&self, _tx_hash: &str, _network: &str) -> TransactionVerification {
			self.outcome.lock().unwrap().clone()
		}
	}

	/// Records notification events; optionally fails every call.
	struct TestSink {
		fail: bool,
		events: Mutex<Vec<String>>,
	}

	impl TestSink {
		fn new(fail: bool) -> Self {
			Self {
				fail,
				events: Mutex::new(Vec::new()),
			}
		}

		fn push(&self, event: &str) -> Result<()> {
			if self.fail {
				return Err(MarketError::Storage("notification sink down".into()));
			}
			self.events.lock().unwrap().push(event.to_string());
			Ok(())
		}

		fn events(&self) -> Vec<String> {
			self.events.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl NotificationSink for TestSink {
		async fn notify_order_created(&self, _: UserId, _: OrderId, _: &str) -> Result<()> {
			self.push("order_created")
		}

		async fn notify_payment_reported(&self, _: UserId, _: OrderId, verified: bool) -> Result<()> {
			self.push(if verified {
				"payment_verified"
			} else {
				"payment_reported"
			})
		}

		async fn notify_payment_confirmed(&self, _: UserId, _: OrderId) -> Result<()> {
			self.push("payment_confirmed")
		}

		async fn notify_order_completed(&self, _: UserId, _: OrderId) -> Result<()> {
			self.push("order_completed")
		}

		async fn notify_order_cancelled(&self, _: UserId, _: OrderId) -> Result<()> {
			self.push("order_cancelled")
		}

		async fn notify_product_approved(&self, _: UserId, _: ProductId, _: &str) -> Result<()> {
			self.push("product_approved")
		}

		async fn notify_product_rejected(
			&self,
			_: UserId,
			_: ProductId,
			_: &str,
			_: &str,
		) -> Result<()> {
			self.push("product_rejected")
		}

		async fn notify_new_review(&self, _: UserId, _: OrderId, _: u8, _: &str) -> Result<()> {
			self.push("new_review")
		}

		async fn notify_refund_requested(&self, _: UserId, _: OrderId) -> Result<()> {
			self.push("refund_requested")
		}

		async fn notify_refund_decision(
			&self,
			_: UserId,
			_: OrderId,
			approved: bool,
			_: Option<&str>,
		) -> Result<()> {
			self.push(if approved {
				"refund_approved"
			} else {
				"refund_rejected"
			})
		}
	}

	fn product(id: ProductId, delivery_type: DeliveryType, status: ProductStatus) -> Product {
		Product {
			id,
			seller_id: SELLER,
			title: format!("Skill #{}", id),
			description: None,
			category: None,
			tags: None,
			preview_image_url: None,
			price_usd: Decimal::new(5000, 2), // $50.00
			delivery_type,
			delivery_content: Some("https://vault.example/key".to_string()),
			status,
			review_reason: None,
			created_at: Utc::now(),
		}
	}

	struct Harness {
		service: Arc<OrderService>,
		sink: Arc<TestSink>,
		verifier: Arc<StubVerifier>,
	}

	fn harness_with(
		products: Vec<Product>,
		outcome: TransactionVerification,
		failing_sink: bool,
	) -> Harness {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let sink = Arc::new(TestSink::new(failing_sink));
		let catalog = Arc::new(StaticCatalog {
			products: products.into_iter().map(|p| (p.id, p)).collect(),
		});
		let verifier = Arc::new(StubVerifier {
			outcome: Mutex::new(outcome),
		});
		let service = Arc::new(OrderService::new(
			OrderStore::new(storage),
			catalog,
			verifier.clone(),
			sink.clone(),
		));
		Harness {
			service,
			sink,
			verifier,
		}
	}

	fn harness(products: Vec<Product>) -> Harness {
		harness_with(products, TransactionVerification::failure("no backend"), false)
	}

	fn manual_product() -> Product {
		product(1, DeliveryType::Manual, ProductStatus::Approved)
	}

	fn auto_product() -> Product {
		product(2, DeliveryType::AutoHosted, ProductStatus::Approved)
	}

	#[tokio::test]
	async fn create_snapshots_price_and_notifies_seller() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		assert_eq!(order.status, OrderStatus::Created);
		assert_eq!(order.buyer_id, BUYER);
		assert_eq!(order.seller_id, SELLER);
		assert_eq!(order.amount_usd, Decimal::new(5000, 2));
		assert_eq!(h.sink.events(), vec!["order_created"]);
	}

	#[tokio::test]
	async fn create_rejects_self_purchase_and_creates_nothing() {
		let h = harness(vec![manual_product()]);
		let err = h.service.create(SELLER, 1).await.unwrap_err();
		assert!(matches!(err, MarketError::Forbidden(_)));
		assert!(h.service.find_all().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn create_rejects_missing_or_unapproved_products() {
		let h = harness(vec![product(3, DeliveryType::Manual, ProductStatus::Draft)]);

		let err = h.service.create(BUYER, 99).await.unwrap_err();
		assert!(matches!(err, MarketError::NotFound(_)));

		let err = h.service.create(BUYER, 3).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
	}

	#[tokio::test]
	async fn report_payment_without_evidence_lands_in_paid_reported() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let order = h
			.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);
		assert!(!order.payment_verified);
		assert!(order.verification_details.is_none());
	}

	#[tokio::test]
	async fn report_payment_with_verified_evidence_escalates() {
		let verified = TransactionVerification {
			verified: true,
			amount: Some("4.00000000".to_string()),
			..Default::default()
		};
		let h = harness_with(vec![manual_product()], verified, false);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let order = h
			.service
			.report_payment(
				order.id,
				BUYER,
				Some("0xabc".to_string()),
				Some("ethereum".to_string()),
			)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaymentVerified);
		assert!(order.payment_verified);
		assert_eq!(
			order.verification_details.unwrap().amount.as_deref(),
			Some("4.00000000")
		);
		assert_eq!(h.sink.events(), vec!["order_created", "payment_verified"]);
	}

	#[tokio::test]
	async fn report_payment_with_failed_verification_still_reports() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let order = h
			.service
			.report_payment(
				order.id,
				BUYER,
				Some("0xabc".to_string()),
				Some("ethereum".to_string()),
			)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);
		assert!(!order.payment_verified);
		// The failed outcome is still recorded as evidence
		assert!(order.verification_details.unwrap().error.is_some());
	}

	#[tokio::test]
	async fn report_payment_guards_caller_and_status() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let err = h
			.service
			.report_payment(order.id, SELLER, None, None)
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::Forbidden(_)));

		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		let err = h
			.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
		// Status unchanged by the rejected second report
		let order = h.service.find_one(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);

		let err = h
			.service
			.report_payment(404, BUYER, None, None)
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::NotFound(_)));
	}

	#[tokio::test]
	async fn verify_payment_requires_transaction_details() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();
		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();

		let err = h.service.verify_payment(order.id, BUYER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
	}

	#[tokio::test]
	async fn failed_reverification_records_outcome_without_status_change() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();
		h.service
			.report_payment(
				order.id,
				BUYER,
				Some("0xabc".to_string()),
				Some("ethereum".to_string()),
			)
			.await
			.unwrap();

		let order = h.service.verify_payment(order.id, BUYER).await.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);
		assert_eq!(
			order.verification_details.unwrap().error.as_deref(),
			Some("no backend")
		);
	}

	#[tokio::test]
	async fn successful_reverification_escalates_status() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		// The explorer has not seen the transaction yet at report time
		let order = h
			.service
			.report_payment(
				order.id,
				BUYER,
				Some("0xabc".to_string()),
				Some("ethereum".to_string()),
			)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);

		// Later the transaction confirms and re-verification succeeds
		h.verifier.set(TransactionVerification {
			verified: true,
			..Default::default()
		});
		let order = h.service.verify_payment(order.id, BUYER).await.unwrap();
		assert_eq!(order.status, OrderStatus::PaymentVerified);
		assert!(order.payment_verified);
	}

	#[tokio::test]
	async fn confirm_payment_accepts_reported_and_verified_states() {
		let verified = TransactionVerification {
			verified: true,
			..Default::default()
		};
		let h = harness_with(
			vec![manual_product(), {
				let mut p = manual_product();
				p.id = 5;
				p
			}],
			verified,
			false,
		);

		// From PaidReported
		let first = h.service.create(BUYER, 1).await.unwrap();
		h.service
			.report_payment(first.id, BUYER, None, None)
			.await
			.unwrap();
		let first = h.service.confirm_payment(first.id, SELLER).await.unwrap();
		assert_eq!(first.status, OrderStatus::Confirmed);

		// From PaymentVerified
		let second = h.service.create(BUYER, 5).await.unwrap();
		h.service
			.report_payment(
				second.id,
				BUYER,
				Some("0xabc".to_string()),
				Some("ethereum".to_string()),
			)
			.await
			.unwrap();
		let second = h.service.confirm_payment(second.id, SELLER).await.unwrap();
		assert_eq!(second.status, OrderStatus::Confirmed);
	}

	#[tokio::test]
	async fn confirm_payment_auto_delivery_completes_immediately() {
		let h = harness(vec![auto_product()]);
		let order = h.service.create(BUYER, 2).await.unwrap();
		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();

		let order = h.service.confirm_payment(order.id, SELLER).await.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert!(h.sink.events().contains(&"order_completed".to_string()));

		// Delivery content is immediately retrievable
		let delivery = h
			.service
			.get_delivery_content(order.id, BUYER)
			.await
			.unwrap();
		assert_eq!(delivery.delivery_type, DeliveryType::AutoHosted);
	}

	#[tokio::test]
	async fn confirm_payment_guards() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let err = h.service.confirm_payment(order.id, SELLER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));

		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		let err = h.service.confirm_payment(order.id, BUYER).await.unwrap_err();
		assert!(matches!(err, MarketError::Forbidden(_)));
	}

	#[tokio::test]
	async fn complete_order_requires_confirmed() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let err = h.service.complete_order(order.id, SELLER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
	}

	#[tokio::test]
	async fn cancel_rejects_terminal_and_hold_states() {
		let h = harness(vec![auto_product()]);
		let order = h.service.create(BUYER, 2).await.unwrap();
		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		h.service.confirm_payment(order.id, SELLER).await.unwrap();

		// Completed
		let err = h.service.cancel_order(order.id, BUYER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
		assert_eq!(
			h.service.find_one(order.id).await.unwrap().status,
			OrderStatus::Completed
		);

		// RefundRequested is a hold, not cancellable
		h.service.hold_for_refund(order.id).await.unwrap();
		let err = h.service.cancel_order(order.id, BUYER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));

		// Refunded is terminal
		h.service.mark_refunded(order.id).await.unwrap();
		let err = h.service.cancel_order(order.id, SELLER).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));
	}

	#[tokio::test]
	async fn cancel_requires_a_party() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let err = h.service.cancel_order(order.id, 999).await.unwrap_err();
		assert!(matches!(err, MarketError::Forbidden(_)));

		let order = h.service.cancel_order(order.id, SELLER).await.unwrap();
		assert_eq!(order.status, OrderStatus::Cancelled);
	}

	#[tokio::test]
	async fn delivery_content_is_buyer_only_and_completed_only() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();

		let err = h
			.service
			.get_delivery_content(order.id, BUYER)
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));

		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		h.service.confirm_payment(order.id, SELLER).await.unwrap();
		h.service.complete_order(order.id, SELLER).await.unwrap();

		let err = h
			.service
			.get_delivery_content(order.id, SELLER)
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::Forbidden(_)));

		let delivery = h
			.service
			.get_delivery_content(order.id, BUYER)
			.await
			.unwrap();
		assert_eq!(
			delivery.delivery_content.as_deref(),
			Some("https://vault.example/key")
		);
	}

	#[tokio::test]
	async fn manual_order_end_to_end() {
		let h = harness(vec![manual_product()]);

		let order = h.service.create(BUYER, 1).await.unwrap();
		assert_eq!(order.amount_usd, Decimal::new(5000, 2));

		let order = h
			.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);

		let order = h.service.confirm_payment(order.id, SELLER).await.unwrap();
		assert_eq!(order.status, OrderStatus::Confirmed, "manual delivery must not auto-complete");

		let order = h.service.complete_order(order.id, SELLER).await.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);

		assert!(h
			.service
			.get_delivery_content(order.id, BUYER)
			.await
			.is_ok());
		assert!(h
			.service
			.get_delivery_content(order.id, 999)
			.await
			.is_err());

		assert_eq!(
			h.sink.events(),
			vec![
				"order_created",
				"payment_reported",
				"payment_confirmed",
				"order_completed"
			]
		);
	}

	#[tokio::test]
	async fn notification_failures_do_not_roll_back_transitions() {
		let h = harness_with(
			vec![manual_product()],
			TransactionVerification::failure("no backend"),
			true,
		);

		let order = h.service.create(BUYER, 1).await.unwrap();
		let order = h
			.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::PaidReported);

		let order = h.service.confirm_payment(order.id, SELLER).await.unwrap();
		assert_eq!(order.status, OrderStatus::Confirmed);
	}

	#[tokio::test]
	async fn concurrent_cancel_and_confirm_have_one_winner() {
		let h = harness(vec![auto_product()]);
		let order = h.service.create(BUYER, 2).await.unwrap();
		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();

		let cancel = {
			let service = h.service.clone();
			let id = order.id;
			tokio::spawn(async move { service.cancel_order(id, BUYER).await })
		};
		let confirm = {
			let service = h.service.clone();
			let id = order.id;
			tokio::spawn(async move { service.confirm_payment(id, SELLER).await })
		};

		let cancel = cancel.await.unwrap();
		let confirm = confirm.await.unwrap();

		let final_status = h.service.find_one(order.id).await.unwrap().status;
		match (cancel.is_ok(), confirm.is_ok()) {
			(true, false) => assert_eq!(final_status, OrderStatus::Cancelled),
			(false, true) => assert_eq!(final_status, OrderStatus::Completed),
			(cancelled, confirmed) => {
				panic!(
					"expected exactly one winner, got cancel={} confirm={}",
					cancelled, confirmed
				)
			}
		}
	}

	#[tokio::test]
	async fn refund_hooks_respect_hold_state() {
		let h = harness(vec![manual_product()]);
		let order = h.service.create(BUYER, 1).await.unwrap();
		h.service
			.report_payment(order.id, BUYER, None, None)
			.await
			.unwrap();
		h.service.confirm_payment(order.id, SELLER).await.unwrap();
		h.service.complete_order(order.id, SELLER).await.unwrap();

		let order = h.service.hold_for_refund(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::RefundRequested);

		// A second hold is rejected: not a refundable state anymore
		let err = h.service.hold_for_refund(order.id).await.unwrap_err();
		assert!(matches!(err, MarketError::InvalidState(_)));

		let order = h.service.release_refund_hold(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);

		// Releasing an order that is not on hold leaves it untouched
		let order = h.service.release_refund_hold(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);

		let order = h.service.hold_for_refund(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::RefundRequested);
		let order = h.service.mark_refunded(order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Refunded);
	}
}
