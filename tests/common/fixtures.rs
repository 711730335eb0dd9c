//! Test fixtures and constants.
//!
//! Ids follow the order of the events and participants in [`config_yaml`].

use std::path::Path;

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const LINK_SECRET: &str = "integration-test-secret";

pub const TEMPLATE_WIDTH: u32 = 400;
pub const TEMPLATE_HEIGHT: u32 = 200;

/// Seeded events
pub mod events {
    /// Public, with template and placement
    pub const WORKSHOP: u64 = 1;
    /// Not visible
    pub const HIDDEN: u64 = 2;
    /// Protected, with template
    pub const RETREAT: u64 = 3;
    /// Public, no template uploaded
    pub const NO_TEMPLATE: u64 = 4;
}

/// Seeded participants
pub mod participants {
    pub const JANE: u64 = 1;
    pub const JANE_EMAIL: &str = "jane@example.com";
    pub const MAX: u64 = 2;
    pub const MAX_EMAIL: &str = "max@example.com";
    pub const HIDDEN_EMAIL: &str = "ghost@example.com";
    pub const VIP: u64 = 4;
    pub const VIP_EMAIL: &str = "vip@example.com";
    pub const BOB_EMAIL: &str = "bob@example.com";
}

/// config.yaml for a test app whose storage lives under `root`
pub fn config_yaml(root: &Path) -> String {
    format!(
        r##"
storage:
  templates_dir: {templates}
  certificates_dir: {certificates}
links:
  validity_secs: 600
  secret: {LINK_SECRET}
captcha:
  ttl_secs: 60
proxy:
  trust_forwarded_headers: true
admins:
  - username: tester
    token: {ADMIN_TOKEN}
events:
  - name: Rust Workshop
    description: Hands-on async Rust
    date: 2026-05-20
    template: workshop.png
    placement:
      x_percent: 50
      y_percent: 40
      font_size: 24
      font_color: "#1a1a80"
      font_key: helvetica
    participants:
      - name: Jane Doe
        email: jane@example.com
      - name: Max Muster
        email: max@example.com
  - name: Hidden Meetup
    visible: false
    participants:
      - name: Ghost
        email: ghost@example.com
  - name: Private Retreat
    protected: true
    template: retreat.png
    participants:
      - name: Very Important
        email: vip@example.com
  - name: Plain Event
    participants:
      - name: Bob
        email: bob@example.com
"##,
        templates = root.join("templates").display(),
        certificates = root.join("certificates").display(),
    )
}

/// White PNG of the given size
pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

/// White JPEG of the given size
pub fn blank_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    bytes
}

/// Answer a question like `7 × 3 = ?`
pub fn solve_captcha(question: &str) -> String {
    let parts: Vec<&str> = question.split_whitespace().collect();
    assert_eq!(parts.len(), 5, "Unexpected captcha question: {question}");
    let a: i64 = parts[0].parse().expect("left operand");
    let b: i64 = parts[2].parse().expect("right operand");
    let result = match parts[1] {
        "+" => a + b,
        "-" => a - b,
        "×" => a * b,
        op => panic!("Unknown captcha operator {op}"),
    };
    result.to_string()
}
