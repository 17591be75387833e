//! Operator semantics, split by operator family. Everything here is
//! `impl Interpreter`.

pub mod access;
pub mod binary;
pub mod compare;
pub mod unary;
