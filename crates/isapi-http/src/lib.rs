//! ISAPI transport: HTTP GET with Digest authentication over reqwest.

pub mod client;
pub mod digest;

pub use client::{
    consts, ClientOptions, Credentials, DigestClient, HttpResponse, HttpTransport,
    TransportError,
};
pub use digest::{Algorithm, DigestChallenge};
