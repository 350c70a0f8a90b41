//! Pipeline stages for documentation bundling.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the captioning backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ file ──▶ images ──▶ resolve ──▶ optimize ──▶ store
//! (walkdir)   (per-doc)  (regex)   (candidates)  (quality     (md5-named
//!                │                               ladder)      media dir)
//!                └─▶ frontmatter (split / merge / serialize)
//! ```
//!
//! 1. [`discover`]    — recursive scan for `.md`/`.mdx` documents
//! 2. [`file`]        — the per-document state machine: read, split
//!    frontmatter, rewrite images, merge metadata, serialize
//! 3. [`frontmatter`] — YAML header split, metadata merge, re-serialisation
//! 4. [`images`]      — scan the body for `![alt](path)` references and
//!    rewrite local ones; the only stage that talks to the captioner
//! 5. [`resolve`]     — ordered candidate-path probing for a reference
//! 6. [`optimize`]    — shrink an image under the byte ceiling; runs in
//!    `spawn_blocking` because re-encoding is CPU-bound
//! 7. [`store`]       — copy optimized bytes into the content-addressed
//!    media directory

pub mod discover;
pub mod file;
pub mod frontmatter;
pub mod images;
pub mod optimize;
pub mod resolve;
pub mod store;
