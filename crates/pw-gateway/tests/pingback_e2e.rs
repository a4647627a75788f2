//! End-to-end pingback and widget scenarios against known signatures.

use pw_core::{ApiType, GatewayError, ParameterSet, Product};
use pw_gateway::{GatewayConfig, Pingback, ValidationError, Widget};
use sha2::{Digest, Sha256};

fn expected_sig() -> String {
    hex::encode(Sha256::digest(b"currency=10ref=r1sign_version=3type=0uid=1abc"))
}

fn vc_params(sig: &str) -> ParameterSet {
    [
        ("uid", "1"),
        ("type", "0"),
        ("ref", "r1"),
        ("currency", "10"),
        ("sign_version", "3"),
        ("sig", sig),
    ]
    .into_iter()
    .collect()
}

#[test]
fn valid_virtual_currency_pingback_is_deliverable() {
    let pingback = Pingback::new(vc_params(&expected_sig()), "10.0.0.1", ApiType::VirtualCurrency, "abc");

    let outcome = pingback.validate(true);
    assert!(outcome.is_valid(), "unexpected errors: {:?}", outcome.messages());
    assert!(pingback.is_deliverable());
    assert!(!pingback.is_cancelable());
    assert_eq!(pingback.vc_amount(), "10");
    assert_eq!(pingback.reference_id(), "r1");
}

#[test]
fn altered_signature_is_rejected() {
    let mut sig = expected_sig();
    let last = sig.pop().unwrap();
    sig.push(if last == '0' { '1' } else { '0' });

    let pingback = Pingback::new(vc_params(&sig), "10.0.0.1", ApiType::VirtualCurrency, "abc");
    let outcome = pingback.validate(true);

    assert!(!outcome.is_valid());
    assert_eq!(outcome.first_error(), Some(&ValidationError::WrongSignature));
    assert_eq!(outcome.messages(), vec!["Wrong signature".to_string()]);
}

#[test]
fn origin_checked_before_signature() {
    let pingback = Pingback::new(vc_params("bogus"), "10.0.0.1", ApiType::VirtualCurrency, "abc");
    let outcome = pingback.validate(false);

    assert_eq!(outcome.errors(), &[ValidationError::IpNotWhitelisted]);
}

#[test]
fn presence_reports_only_first_missing_field() {
    let params: ParameterSet = [("uid", "1"), ("sig", "x"), ("sign_version", "3")]
        .into_iter()
        .collect();
    let pingback = Pingback::new(params, "216.127.71.5", ApiType::VirtualCurrency, "abc");

    let outcome = pingback.validate(false);
    assert_eq!(outcome.errors().len(), 1);
    assert_eq!(outcome.messages(), vec!["Parameter type is missing.".to_string()]);
}

#[test]
fn digital_goods_widget_rejects_two_products() {
    let mut widget = Widget::new("app", "secret", ApiType::DigitalGoods, "u1", "p1_1");

    let result = widget.append_products(vec![
        Product::fixed("a", "A", 1.0, "USD"),
        Product::fixed("b", "B", 2.0, "USD"),
    ]);

    assert!(matches!(result, Err(GatewayError::OnlyOneProductAllowed)));
    assert!(widget.products().is_empty());
}

#[test]
fn widget_signature_verifies_through_config() {
    let config = GatewayConfig::new("app", "secret").with_api_type(ApiType::DigitalGoods);
    let mut widget = config.widget("u1");
    widget
        .append_product(Product::fixed("gems", "Gems", 4.99, "USD"))
        .unwrap();

    let params = widget.params_at(1_700_000_000);
    let sign = params.get("sign").unwrap().to_string();

    let engine = config.signature_engine();
    assert!(engine.verify(&params, Some("sign"), &sign, "secret", widget.sign_version()));

    let tampered = params.clone().with("amount", "0.01");
    assert!(!engine.verify(&tampered, Some("sign"), &sign, "secret", widget.sign_version()));
}
