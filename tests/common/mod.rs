//! Shared fixtures: generated PDFs, scripted delegates and multipart bodies.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::sync::Barrier;

use resume_intake::config::Config;
use resume_intake::services::{ExtractionDelegate, IntakePipeline, ScratchSpace};

pub const BOUNDARY: &str = "resume-intake-test-boundary";

/// Builds a PDF with one page per entry; `None` makes a blank page.
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => Vec::new(),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Delegate that records its input and what scratch space held at call time.
pub struct RecordingDelegate {
    scratch_root: PathBuf,
    reply: Result<String, String>,
    barrier: Option<Arc<Barrier>>,
    pub calls: Mutex<Vec<Call>>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub text: String,
    pub staged: Vec<String>,
}

impl RecordingDelegate {
    pub fn replying(scratch_root: &Path, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            scratch_root: scratch_root.to_path_buf(),
            reply: Ok(reply.to_string()),
            barrier: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(scratch_root: &Path, message: &str) -> Arc<Self> {
        Arc::new(Self {
            scratch_root: scratch_root.to_path_buf(),
            reply: Err(message.to_string()),
            barrier: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every call waits until `parties` calls are in flight at once.
    pub fn rendezvous(scratch_root: &Path, reply: &str, parties: usize) -> Arc<Self> {
        Arc::new(Self {
            scratch_root: scratch_root.to_path_buf(),
            reply: Ok(reply.to_string()),
            barrier: Some(Arc::new(Barrier::new(parties))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionDelegate for RecordingDelegate {
    async fn extract(&self, text: &str) -> Result<String> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let mut staged: Vec<String> = std::fs::read_dir(&self.scratch_root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        staged.sort();

        self.calls.lock().unwrap().push(Call {
            text: text.to_string(),
            staged,
        });

        if let Some(barrier) = &self.barrier {
            // Hold every file in place until all parties have listed.
            barrier.wait().await;
        }

        self.reply.clone().map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn test_config(max_file_size_mb: usize) -> Config {
    Config {
        max_file_size_mb,
        ..Config::default()
    }
}

pub fn pipeline_with(
    scratch_root: &Path,
    config: &Config,
    delegate: Arc<dyn ExtractionDelegate>,
) -> IntakePipeline {
    let scratch = ScratchSpace::initialize(scratch_root).unwrap();
    IntakePipeline::new(config, scratch, delegate)
}

pub fn staged_files(scratch_root: &Path) -> usize {
    std::fs::read_dir(scratch_root).unwrap().count()
}

pub fn is_staged_name(name: &str) -> bool {
    name.len() == 36
        && name.ends_with(".pdf")
        && name[..32].chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

/// One part of a multipart/form-data body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content: &'a [u8],
}

pub fn file_part<'a>(name: &'a str, file_name: &'a str, content: &'a [u8]) -> Part<'a> {
    Part { name, file_name: Some(file_name), content }
}

pub fn text_part<'a>(name: &'a str, content: &'a [u8]) -> Part<'a> {
    Part { name, file_name: None, content }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/pdf\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
