//! Typeinfo Core Types and Definitions
//!
//! This crate provides the foundational types shared by the typeinfo
//! extraction tool and its runtime renderer. It includes:
//!
//! - **Identifiers**: String-interned type names ([`identifier::Id`])
//! - **Qualifiers**: The `const`/`volatile`/`restrict` bitset ([`qualifier::Qualifiers`])
//! - **Built-ins**: The catalog of scalar singleton descriptors ([`builtin::Builtin`])
//! - **Descriptors**: The type descriptor model ([`descriptor`] module)
//! - **Graph**: The arena of named descriptors ([`graph::TypeGraph`])
//! - **Provider**: The interface a declaration front end implements ([`provider::TypeProvider`])
//! - **Memory**: Bounded, fallible access to raw bytes ([`memory::MemorySource`])
//! - **Render**: The generic value renderer ([`render::Renderer`])

pub mod builtin;
pub mod descriptor;
pub mod graph;
pub mod identifier;
pub mod memory;
pub mod provider;
pub mod qualifier;
pub mod render;
