//! In-memory site and HTML fixtures for crawler tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use umcs_schedule::net::{FetchError, Fetcher, Page};
use url::Url;

pub const BASE: &str = "http://moria.umcs.lublin.pl";

/// Absolute URL on the test site.
pub fn at(path: &str) -> String {
    format!("{BASE}{path}")
}

/// Serves canned pages; anything else is a 404.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    stalled: Vec<String>,
    requested: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, body: impl Into<String>) -> Self {
        self.pages.insert(at(path), body.into());
        self
    }

    /// Requests for `path` never complete.
    pub fn stall(mut self, path: &str) -> Self {
        self.stalled.push(at(path));
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());

        if self.stalled.iter().any(|s| s == url.as_str()) {
            std::future::pending::<()>().await;
        }

        match self.pages.get(url.as_str()) {
            Some(body) => Ok(Page {
                url: url.clone(),
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

pub fn listing_page(hrefs: &[&str]) -> String {
    let links: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#))
        .collect();
    format!(
        r#"<html><head><link href="/static/style.css" rel="stylesheet"></head>
           <body><ul class="links">{links}</ul></body></html>"#
    )
}

/// A block as the site renders it, with one teacher, one year group and a room.
pub fn block(style: &str, subject: &str) -> String {
    format!(
        r#"<div class="activity_block" style="{style}">
             <div class="activity_group">1</div>
             <div class="activity_content">
               <div class="subject_content">{subject}</div>
               <div class="teachers_content"><div><a href="/grid/2/5/block-teacher">dr Block</a></div></div>
               <div class="students_content"><div><a href="/grid/1/6/block-group">Fizyka I</a></div></div>
               <div class="bottom_content_containter">
                 <div class="room_content"><a href="/grid/3/7/block-room">310</a></div>
                 <div class="type_content"><a title="Ćwiczenia">Ćw</a></div>
               </div>
             </div>
           </div>"#
    )
}

pub fn table_page(header: &str, blocks: &[String]) -> String {
    let blocks = blocks.concat();
    format!(
        r##"<html><body>
             <div id="plan_header"><a href="#">{header}</a></div>
             <div class="plan_grid">{blocks}</div>
           </body></html>"##
    )
}

pub const MONDAY_8AM: &str = "left: 0%; top: 0%; width: 14.2857%; height: 11.5385%";
pub const WEDNESDAY_3PM: &str = "left: 28.5714%; top: 53.8462%; width: 14.2857%; height: 7.6923%";
pub const BROKEN: &str = "left: 10%; top: not-a-number; width: 14.2857%; height: 5%";
