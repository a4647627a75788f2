//! # Pingback Validation
//!
//! Validates asynchronous payment notifications ("pingbacks") sent by the
//! gateway and classifies what the merchant should do with them.
//!
//! Validation runs three gates in order and stops at the first failure:
//!
//! ```text
//! parameters present ──► origin allowlisted ──► signature matches
//!        │                      │                      │
//!  "Parameter X is missing."   "IP address is       "Wrong signature"
//!                               not whitelisted"
//! ```
//!
//! A failed gate is a diagnostic in the returned [`ValidationOutcome`],
//! never an error or panic.

use pw_core::{ApiType, IpAllowlist, ParameterSet, SignatureEngine, SignatureVersion};
use thiserror::Error;

/// Pingback `type` codes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PingbackType {
    /// `0` - product purchased; check `ref` is unique and deliver
    Regular,
    /// `1` - goodwill credit
    Goodwill,
    /// `2` - chargeback or refund; take the goods back
    Negative,
    /// `12` - user cancelled the subscription
    SubscriptionCancelled,
    /// `13` - subscription expired
    SubscriptionExpired,
    /// `14` - renewal payment failed, subscription stopped
    SubscriptionPaymentFailed,
    /// `200` - payment under risk review; do not deliver yet
    RiskUnderReview,
    /// `201` - risk review accepted; check `ref` is unique and deliver
    RiskReviewedAccepted,
    /// `202` - risk review declined; do not deliver
    RiskReviewedDeclined,
    /// `203` - authorization voided, no capture received in time
    RiskAuthorizationVoided,
    /// Any other code (passthrough)
    Unknown(String),
}

impl PingbackType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => PingbackType::Regular,
            "1" => PingbackType::Goodwill,
            "2" => PingbackType::Negative,
            "12" => PingbackType::SubscriptionCancelled,
            "13" => PingbackType::SubscriptionExpired,
            "14" => PingbackType::SubscriptionPaymentFailed,
            "200" => PingbackType::RiskUnderReview,
            "201" => PingbackType::RiskReviewedAccepted,
            "202" => PingbackType::RiskReviewedDeclined,
            "203" => PingbackType::RiskAuthorizationVoided,
            other => PingbackType::Unknown(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            PingbackType::Regular => "0",
            PingbackType::Goodwill => "1",
            PingbackType::Negative => "2",
            PingbackType::SubscriptionCancelled => "12",
            PingbackType::SubscriptionExpired => "13",
            PingbackType::SubscriptionPaymentFailed => "14",
            PingbackType::RiskUnderReview => "200",
            PingbackType::RiskReviewedAccepted => "201",
            PingbackType::RiskReviewedDeclined => "202",
            PingbackType::RiskAuthorizationVoided => "203",
            PingbackType::Unknown(code) => code,
        }
    }

    /// Business meaning of this type
    pub fn kind(&self) -> CallbackKind {
        match self {
            PingbackType::Regular | PingbackType::Goodwill | PingbackType::RiskReviewedAccepted => {
                CallbackKind::Deliverable
            }
            PingbackType::Negative | PingbackType::RiskReviewedDeclined => CallbackKind::Cancelable,
            PingbackType::RiskUnderReview => CallbackKind::UnderReview,
            _ => CallbackKind::Other,
        }
    }

    /// Subscription lifecycle codes (`12`, `13`, `14`)
    pub fn is_subscription_end(&self) -> bool {
        matches!(
            self,
            PingbackType::SubscriptionCancelled
                | PingbackType::SubscriptionExpired
                | PingbackType::SubscriptionPaymentFailed
        )
    }
}

/// What the merchant should do with a validated pingback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Grant the goods, after checking the reference id is unique
    Deliverable,
    /// Revoke previously granted goods
    Cancelable,
    /// Neither grant nor revoke yet
    UnderReview,
    Other,
}

impl CallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Deliverable => "deliverable",
            CallbackKind::Cancelable => "cancelable",
            CallbackKind::UnderReview => "under_review",
            CallbackKind::Other => "other",
        }
    }
}

/// Chargeback reason codes carried in the `reason` parameter of negative pingbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargebackReason {
    Chargeback,
    CreditCardFraud,
    OtherFraud,
    BadDataEntry,
    FakeProxyUser,
    RejectedByAdvertiser,
    DuplicateConversions,
    GoodwillCreditTakenBack,
    CanceledOrder,
    PartiallyReversed,
}

impl ChargebackReason {
    pub fn from_code(code: &str) -> Option<Self> {
        let reason = match code {
            "1" => ChargebackReason::Chargeback,
            "2" => ChargebackReason::CreditCardFraud,
            "3" => ChargebackReason::OtherFraud,
            "4" => ChargebackReason::BadDataEntry,
            "5" => ChargebackReason::FakeProxyUser,
            "6" => ChargebackReason::RejectedByAdvertiser,
            "7" => ChargebackReason::DuplicateConversions,
            "8" => ChargebackReason::GoodwillCreditTakenBack,
            "9" => ChargebackReason::CanceledOrder,
            "10" => ChargebackReason::PartiallyReversed,
            _ => return None,
        };
        Some(reason)
    }

    /// The gateway recommends banning the user for fraud reasons
    pub fn recommends_ban(&self) -> bool {
        matches!(
            self,
            ChargebackReason::CreditCardFraud | ChargebackReason::OtherFraud
        )
    }
}

/// A failed validation gate. `Display` gives the diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Parameter {0} is missing.")]
    MissingParameter(String),

    #[error("IP address is not whitelisted")]
    IpNotWhitelisted,

    #[error("Wrong signature")]
    WrongSignature,
}

/// Result of one [`Pingback::validate`] call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    fn from_result(result: Result<(), ValidationError>) -> Self {
        Self {
            errors: result.err().into_iter().collect(),
        }
    }

    /// True when every gate passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Diagnostics in the order they were produced (empty on success)
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// Diagnostic texts, e.g. `["Wrong signature"]`
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// An inbound pingback.
///
/// Built once from the raw request parameters and the observed source
/// address; never mutated afterwards. Use one instance per notification.
///
/// The classification queries (`kind`, `is_deliverable`, ...) and accessors
/// read straight from the parameters. Only act on them after `validate`
/// has succeeded.
#[derive(Clone)]
pub struct Pingback {
    params: ParameterSet,
    ip: String,
    api_type: ApiType,
    secret_key: String,
    sign_version: SignatureVersion,
    is_test: bool,
    allowlist: IpAllowlist,
    engine: SignatureEngine,
    raw_signature: Option<Vec<u8>>,
}

impl Pingback {
    /// Create a pingback from its raw parameters.
    ///
    /// `sign_version` is read from the parameters (default `"3"`) and
    /// `is_test=1` marks a test delivery.
    pub fn new(
        params: impl Into<ParameterSet>,
        ip: impl Into<String>,
        api_type: ApiType,
        secret_key: impl Into<String>,
    ) -> Self {
        let params = params.into();
        let sign_version = params
            .get("sign_version")
            .map(SignatureVersion::from_wire)
            .unwrap_or_default();
        let is_test = params.get("is_test") == Some("1");

        Self {
            params,
            ip: ip.into(),
            api_type,
            secret_key: secret_key.into(),
            sign_version,
            is_test,
            allowlist: IpAllowlist::default(),
            engine: SignatureEngine::default(),
            raw_signature: None,
        }
    }

    /// Builder: replace the default gateway allowlist
    pub fn with_allowlist(mut self, allowlist: IpAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Builder: use a configured signature engine (legacy digest encoding)
    pub fn with_signature_engine(mut self, engine: SignatureEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Builder: the claimed signature as received on the wire.
    ///
    /// Parameter values are text, so a raw legacy digest only survives in
    /// these bytes. When set they replace the signature parameter's value
    /// in the signature gate.
    pub fn with_raw_signature(mut self, claimed: impl Into<Vec<u8>>) -> Self {
        self.raw_signature = Some(claimed.into());
        self
    }

    /// Run the presence, origin and signature gates.
    ///
    /// `skip_ip_check` bypasses the origin gate, e.g. for local testing.
    pub fn validate(&self, skip_ip_check: bool) -> ValidationOutcome {
        let result = self
            .check_parameters()
            .and_then(|_| self.check_origin(skip_ip_check))
            .and_then(|_| self.check_signature());
        ValidationOutcome::from_result(result)
    }

    fn check_parameters(&self) -> Result<(), ValidationError> {
        for &name in self.api_type.required_pingback_params() {
            let present = match name {
                "sig" => self.signature_key().is_some(),
                _ => self.params.contains_key(name),
            };
            if !present {
                return Err(ValidationError::MissingParameter(name.to_string()));
            }
        }
        Ok(())
    }

    fn check_origin(&self, skip_ip_check: bool) -> Result<(), ValidationError> {
        if skip_ip_check || self.allowlist.is_allowed(&self.ip) {
            Ok(())
        } else {
            Err(ValidationError::IpNotWhitelisted)
        }
    }

    fn check_signature(&self) -> Result<(), ValidationError> {
        let key = self.signature_key().ok_or(ValidationError::WrongSignature)?;
        let claimed = match &self.raw_signature {
            Some(raw) => raw.as_slice(),
            None => self.params.get_or_empty(key).as_bytes(),
        };

        if self
            .engine
            .verify_bytes(&self.params, Some(key), claimed, &self.secret_key, self.sign_version)
        {
            Ok(())
        } else {
            Err(ValidationError::WrongSignature)
        }
    }

    /// Parameter holding the claimed signature: `sig`, or `sign` when `sig` is absent
    pub fn signature_key(&self) -> Option<&'static str> {
        ["sig", "sign"]
            .into_iter()
            .find(|key| self.params.contains_key(key))
    }

    /// Raw parameter value, empty when absent
    pub fn get(&self, key: &str) -> &str {
        self.params.get_or_empty(key)
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    pub fn source_ip(&self) -> &str {
        &self.ip
    }

    pub fn sign_version(&self) -> SignatureVersion {
        self.sign_version
    }

    /// Whether the gateway flagged this as a test delivery (`is_test=1`)
    pub fn is_test(&self) -> bool {
        self.is_test
    }

    pub fn pingback_type(&self) -> PingbackType {
        PingbackType::from_code(self.get("type"))
    }

    pub fn kind(&self) -> CallbackKind {
        self.pingback_type().kind()
    }

    /// Regular, goodwill or risk-accepted: grant the goods if `ref` is new
    pub fn is_deliverable(&self) -> bool {
        self.kind() == CallbackKind::Deliverable
    }

    /// Chargeback/refund or risk-declined: revoke the goods
    pub fn is_cancelable(&self) -> bool {
        self.kind() == CallbackKind::Cancelable
    }

    /// Risk review pending: take no action yet
    pub fn is_under_review(&self) -> bool {
        self.kind() == CallbackKind::UnderReview
    }

    /// User id as sent in the widget's `uid`
    pub fn uid(&self) -> &str {
        self.get("uid")
    }

    /// Virtual currency amount
    pub fn vc_amount(&self) -> &str {
        self.get("currency")
    }

    pub fn product_id(&self) -> &str {
        self.get("goodsid")
    }

    /// Subscription period as `(length, unit)`
    pub fn product_period(&self) -> (&str, &str) {
        (self.get("slength"), self.get("speriod"))
    }

    /// Gateway reference id; the caller must deduplicate on it
    pub fn reference_id(&self) -> &str {
        self.get("ref")
    }

    pub fn chargeback_reason(&self) -> Option<ChargebackReason> {
        self.params.get("reason").and_then(ChargebackReason::from_code)
    }
}

impl std::fmt::Debug for Pingback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pingback")
            .field("params", &self.params)
            .field("ip", &self.ip)
            .field("api_type", &self.api_type)
            .field("sign_version", &self.sign_version)
            .field("is_test", &self.is_test)
            .field("allowlist", &self.allowlist)
            .field("raw_signature", &self.raw_signature.is_some())
            .finish_non_exhaustive()
    }
}
