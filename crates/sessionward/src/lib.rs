//! # Sessionward
//!
//! Client-side session lifecycle manager.
//!
//! Sessionward decides, from the clock and user interaction alone, when a
//! signed-in session is still usable, when it should be renewed quietly,
//! when the user has to be asked whether to continue, and when the
//! session must be ended. The application supplies the network side by
//! implementing [`SessionActions`]; everything else is handled here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessionward::prelude::*;
//!
//! // Implement SessionActions for your backend, then:
//! // let ward = SessionwardBuilder::new()
//! //     .config(WardConfig::default())
//! //     .build(my_backend);
//! // ward.start();
//! // ward.login(&Credentials::new("kim", "hunter2")).await?;
//! //
//! // // From your UI event handlers:
//! // ward.signal_hub().dispatch(Signal::genuine(SignalCategory::Key));
//! //
//! // // From your timer widget:
//! // let label = ward.display_state().label();
//! ```

mod display;
mod error;
mod ward;

pub use display::{DisplayKind, DisplayState};
pub use error::SessionwardError;
pub use ward::{Sessionward, SessionwardBuilder};

pub use sessionward_activity::{
    AlwaysFocused, FocusFlag, FocusProbe, PulseOutcome, Signal, SignalCategory, SignalHub,
    SignalSource, Subscription,
};
pub use sessionward_checker::{SessionEvent, SessionPhase, TerminationReason};
pub use sessionward_renewal::{ActionError, RenewalFailure, SessionActions};
pub use sessionward_store::SessionSnapshot;
pub use sessionward_types::{
    AccessGrant, Clock, Credentials, ManualClock, RenewalKind, Role, SharedClock, Timestamp,
    TokioClock, UserId, UserInfo, WardConfig,
};

/// Everything an application usually needs, in one import.
pub mod prelude {
    pub use crate::{
        AccessGrant, ActionError, Credentials, DisplayKind, DisplayState, Role, SessionActions,
        SessionEvent, SessionPhase, Sessionward, SessionwardBuilder, SessionwardError, Signal,
        SignalCategory, TerminationReason, UserId, UserInfo, WardConfig,
    };
}
