//! Client-side building blocks for the Equalify accessibility-reporting service:
//! sign-up confirmation, property management and report browsing.

pub mod auth;
pub mod config;
pub mod countdown;
pub mod error;
pub mod events;
pub mod otp;
pub mod page;
pub mod properties;
pub mod query_cache;
pub mod reports;
pub mod transport;
pub mod workflow;

pub use auth::{AuthContext, AuthService, AuthSnapshot, HttpAuthService};
pub use config::{load_settings, ClientSettings};
pub use countdown::{CountdownState, CountdownTimer, RESEND_TIMEOUT_SECONDS};
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, EventBus, ToastLevel};
pub use otp::{OtpCode, OtpInput, OtpValidationError, OTP_LENGTH};
pub use properties::{EditPropertyForm, PropertyClient, PropertyFormData, PropertyPages};
pub use reports::{ReportsClient, TagDetailsView};
pub use workflow::{FormPhase, FormView, OtpWorkflow, ResendOutcome, SubmitOutcome};
