//! # Pingback Dispatch
//!
//! Routes a validated pingback to the integrating application's handler.
//! Persistence and deduplication by reference id are the handler's job.

use crate::pingback::{CallbackKind, Pingback};
use pw_core::{GatewayError, GatewayResult};
use tracing::{debug, info, warn};

/// Pingback event handler trait
///
/// Implement this trait to grant and revoke goods. Default methods only log.
#[allow(unused_variables)]
pub trait PingbackHandler: Send + Sync {
    /// Regular purchase, goodwill credit or risk-accepted payment.
    /// Check `reference_id()` has not been seen before granting.
    fn on_deliverable(&self, pingback: &Pingback) -> GatewayResult<()> {
        info!(
            "Deliverable pingback: ref={}, uid={}, type={}",
            pingback.reference_id(),
            pingback.uid(),
            pingback.pingback_type().code()
        );
        Ok(())
    }

    /// Chargeback/refund or risk-declined payment
    fn on_cancelable(&self, pingback: &Pingback) -> GatewayResult<()> {
        warn!(
            "Cancelable pingback: ref={}, uid={}, reason={:?}",
            pingback.reference_id(),
            pingback.uid(),
            pingback.chargeback_reason()
        );
        Ok(())
    }

    /// Payment under risk review
    fn on_under_review(&self, pingback: &Pingback) -> GatewayResult<()> {
        info!("Pingback under review: ref={}", pingback.reference_id());
        Ok(())
    }

    /// Subscription cancelled, expired or stopped after failed renewal
    fn on_subscription_ended(&self, pingback: &Pingback) -> GatewayResult<()> {
        info!(
            "Subscription ended: ref={}, uid={}, type={}",
            pingback.reference_id(),
            pingback.uid(),
            pingback.pingback_type().code()
        );
        Ok(())
    }

    /// Any other pingback type
    fn on_other(&self, pingback: &Pingback) -> GatewayResult<()> {
        debug!("Unhandled pingback type: {}", pingback.pingback_type().code());
        Ok(())
    }
}

/// Default handler (just logs pingbacks)
pub struct LoggingPingbackHandler;

impl PingbackHandler for LoggingPingbackHandler {}

/// Validate a pingback and dispatch it to the matching handler method.
///
/// Invalid pingbacks never reach the handler; they fail with
/// [`GatewayError::PingbackRejected`] carrying the first diagnostic.
pub fn dispatch_pingback(
    handler: &dyn PingbackHandler,
    pingback: &Pingback,
    skip_ip_check: bool,
) -> GatewayResult<CallbackKind> {
    let outcome = pingback.validate(skip_ip_check);
    if let Some(error) = outcome.first_error() {
        warn!(
            "Pingback rejected: ref={}, ip={}, error={}",
            pingback.reference_id(),
            pingback.source_ip(),
            error
        );
        return Err(GatewayError::PingbackRejected(error.to_string()));
    }

    let pingback_type = pingback.pingback_type();
    let kind = pingback_type.kind();

    if pingback.is_test() {
        debug!("Test pingback: ref={}", pingback.reference_id());
    }

    match kind {
        CallbackKind::Deliverable => handler.on_deliverable(pingback)?,
        CallbackKind::Cancelable => handler.on_cancelable(pingback)?,
        CallbackKind::UnderReview => handler.on_under_review(pingback)?,
        CallbackKind::Other if pingback_type.is_subscription_end() => {
            handler.on_subscription_ended(pingback)?
        }
        CallbackKind::Other => handler.on_other(pingback)?,
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::{ApiType, ParameterSet, SignatureEngine, SignatureVersion};
    use std::sync::Mutex;

    const SECRET: &str = "secret";

    fn signed(type_code: &str) -> Pingback {
        let params = ParameterSet::new()
            .with("uid", "u1")
            .with("type", type_code)
            .with("ref", "r1")
            .with("goodsid", "vip")
            .with("sign_version", "3");
        let sig = SignatureEngine::new().compute(&params, Some("sig"), SECRET, SignatureVersion::V3);
        Pingback::new(params.with("sig", sig), "216.127.71.1", ApiType::DigitalGoods, SECRET)
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingHandler {
        fn record(&self, name: &'static str) -> GatewayResult<()> {
            self.calls.lock().unwrap().push(name);
            Ok(())
        }
    }

    impl PingbackHandler for RecordingHandler {
        fn on_deliverable(&self, _pingback: &Pingback) -> GatewayResult<()> {
            self.record("deliverable")
        }

        fn on_cancelable(&self, _pingback: &Pingback) -> GatewayResult<()> {
            self.record("cancelable")
        }

        fn on_under_review(&self, _pingback: &Pingback) -> GatewayResult<()> {
            self.record("under_review")
        }

        fn on_subscription_ended(&self, _pingback: &Pingback) -> GatewayResult<()> {
            self.record("subscription_ended")
        }

        fn on_other(&self, _pingback: &Pingback) -> GatewayResult<()> {
            self.record("other")
        }
    }

    #[test]
    fn test_dispatch_by_kind() {
        let handler = RecordingHandler::default();

        for code in ["0", "2", "200", "13", "203"] {
            dispatch_pingback(&handler, &signed(code), false).unwrap();
        }

        assert_eq!(
            *handler.calls.lock().unwrap(),
            vec!["deliverable", "cancelable", "under_review", "subscription_ended", "other"]
        );
    }

    #[test]
    fn test_dispatch_returns_kind() {
        let kind = dispatch_pingback(&LoggingPingbackHandler, &signed("201"), false).unwrap();
        assert_eq!(kind, CallbackKind::Deliverable);
    }

    #[test]
    fn test_invalid_pingback_not_dispatched() {
        let handler = RecordingHandler::default();
        let pingback = Pingback::new(
            signed("0").params().clone().with("uid", "someone-else"),
            "216.127.71.1",
            ApiType::DigitalGoods,
            SECRET,
        );

        let result = dispatch_pingback(&handler, &pingback, false);
        match result {
            Err(GatewayError::PingbackRejected(message)) => assert_eq!(message, "Wrong signature"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(handler.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handler_error_propagates() {
        struct FailingHandler;
        impl PingbackHandler for FailingHandler {
            fn on_deliverable(&self, _pingback: &Pingback) -> GatewayResult<()> {
                Err(GatewayError::Handler("ledger unavailable".into()))
            }
        }

        let result = dispatch_pingback(&FailingHandler, &signed("0"), false);
        assert!(matches!(result, Err(GatewayError::Handler(_))));
    }
}
