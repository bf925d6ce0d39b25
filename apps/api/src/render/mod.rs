// Document Compiler stage: LaTeX markup → PDF bytes via an external toolchain.

pub mod compiler;
