//! # sodalite-k8s - Kubernetes resources from Ansible-style parameters
//!
//! sodalite-k8s lets an operator declare Kubernetes objects (ConfigMap, Secret,
//! Namespace, PersistentVolumeClaim, StorageClass, Service, Deployment and
//! Ingress) with flat, snake_case parameters instead of raw manifests.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │              (render / validate / apply / list via clap)             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Module Registry                             │
//! │        (k8s_configmap, k8s_secret, ... k8s_deployment, k8s_ingress)  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │   Definition    │   │     Validators      │   │   Execution layer   │
//! │    builders     │──►│  (format rules +    │──►│  (create / patch /  │
//! │  (+ clean_dict) │   │   per-kind rules)   │   │  replace / delete)  │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                                              │
//!                                                              ▼
//!                                          ┌───────────────────────────────┐
//!                                          │ ResourceClient: in-memory or  │
//!                                          │ kube-rs (`kubernetes` feature)│
//!                                          └───────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use sodalite_k8s::prelude::*;
//! use serde_json::json;
//!
//! let registry = ModuleRegistry::with_builtins();
//! let module = registry.require("k8s_configmap").unwrap();
//!
//! let params: ModuleParams = serde_json::from_value(json!({
//!     "name": "app-config",
//!     "data": {"LOG_LEVEL": "debug"}
//! }))
//! .unwrap();
//!
//! let definition = module.render(&params).unwrap();
//! assert_eq!(definition["kind"], "ConfigMap");
//! assert_eq!(definition["data"]["LOG_LEVEL"], "debug");
//! ```

// Re-export commonly used items in prelude
pub mod prelude {
    //! Common imports for sodalite-k8s.
    //!
    //! ```rust
    //! use sodalite_k8s::prelude::*;
    //! ```

    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::modules::k8s::executor::{InMemoryClient, ResourceClient, ResourceKey};
    pub use crate::modules::{
        Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleRegistry,
        ModuleResult, ModuleStatus,
    };
}

/// Error types and result aliases.
pub mod error;

/// Configuration loading and merging.
///
/// Handles loading and merging configuration from multiple sources:
/// environment variables, config files, and command-line arguments.
pub mod config;

/// Module system and the Kubernetes resource modules.
pub mod modules;

/// Returns the current version of sodalite-k8s.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
