#![allow(dead_code)]

#[derive(calmform::form::FormModel)]
struct Credentials(String, String);

fn main() {}
