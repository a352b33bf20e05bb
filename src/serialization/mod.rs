//! Model persistence.
//!
//! The model store is a single SafeTensors-format file holding the
//! fitted algorithm state as F32 tensors plus the hyperparameters as
//! string metadata. F32 values round-trip bit-exact through this
//! format.

pub mod safetensors;
