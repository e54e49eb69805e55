//! JAdES Credentials — Header builder, signer, presenter, and verifier for
//! selectively disclosable JAdES credentials.

pub mod builder;
pub mod error;
pub mod presenter;
pub mod signer;
pub mod verifier;

pub use builder::HeaderBuilder;
pub use error::CredentialError;
pub use presenter::Presenter;
pub use signer::{QualifyingMaterials, Signer};
pub use verifier::{DecodedHeaders, KeyBinding, VerificationOutcome, Verifier};
