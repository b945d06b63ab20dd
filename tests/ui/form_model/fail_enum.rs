#![allow(dead_code)]

#[derive(calmform::form::FormModel)]
enum LoginStep {
    Credentials { username: String },
    Done,
}

fn main() {}
