//! Terminal output helpers

use colored::Colorize;

pub fn print_success(message: &str) {
    println!("{}", message.green());
}

pub fn print_warning(message: &str) {
    println!("{}", message.yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}
