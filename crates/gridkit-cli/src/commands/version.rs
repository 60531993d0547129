//! Version command implementation.

use crate::style::{print_header, print_labeled, print_spacer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() {
    print_header(&format!("gridkit {VERSION}"));
    print_spacer();
    println!("Declarative data-grid queries over JSON records.");
    print_spacer();
    println!("Build info:");
    print_labeled("Target", std::env::consts::ARCH);
    print_labeled("OS", std::env::consts::OS);
}
