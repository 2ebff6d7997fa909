use std::fmt;
use std::str::FromStr;

use canvas_core::artifact::{ContentPayload, ContentVersion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgrammingLanguage {
    TypeScript,
    JavaScript,
    Python,
    Java,
    Cpp,
    Go,
    Rust,
    Ruby,
    Php,
    Html,
    Sql,
}

impl ProgrammingLanguage {
    pub const ALL: [Self; 11] = [
        Self::TypeScript,
        Self::JavaScript,
        Self::Python,
        Self::Java,
        Self::Cpp,
        Self::Go,
        Self::Rust,
        Self::Ruby,
        Self::Php,
        Self::Html,
        Self::Sql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Html => "html",
            Self::Sql => "sql",
        }
    }

    /// Starter program shown by a code quick start.
    pub fn template(&self) -> &'static str {
        match self {
            Self::TypeScript => TYPESCRIPT,
            Self::JavaScript => JAVASCRIPT,
            Self::Python => PYTHON,
            Self::Java => JAVA,
            Self::Cpp => CPP,
            Self::Go => GO,
            Self::Rust => RUST,
            Self::Ruby => RUBY,
            Self::Php | Self::Html | Self::Sql => FALLBACK,
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for ProgrammingLanguage {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == lower)
            .ok_or(UnknownLanguage(lower))
    }
}

/// What a quick start seeds the canvas with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickStart {
    Code(ProgrammingLanguage),
    Text,
}

impl QuickStart {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Code(_) => "Quick start code",
            Self::Text => "Quick start text",
        }
    }

    pub fn payload(&self) -> ContentPayload {
        match self {
            Self::Code(lang) => ContentPayload::code(lang.as_str(), lang.template()),
            Self::Text => ContentPayload::text(""),
        }
    }

    /// Version 1 of a fresh artifact.
    pub fn first_version(&self) -> ContentVersion {
        ContentVersion {
            index: 1,
            title: self.title().to_owned(),
            payload: self.payload(),
        }
    }
}

const TYPESCRIPT: &str = r#"// TypeScript Example
interface Greeting {
  message: string;
}

function greet(name: string): Greeting {
  return { message: `Hello, ${name}!` };
}

console.log(greet('World').message);"#;

const JAVASCRIPT: &str = r#"// JavaScript Example
function greet(name) {
  return { message: `Hello, ${name}!` };
}

console.log(greet('World').message);"#;

const PYTHON: &str = r##"# Python Example
def greet(name: str) -> dict:
    return {'message': f'Hello, {name}!'}

print(greet('World')['message'])"##;

const JAVA: &str = r#"// Java Example
public class Greeting {
    public static void main(String[] args) {
        System.out.println(greet("World"));
    }

    static String greet(String name) {
        return String.format("Hello, %s!", name);
    }
}"#;

const CPP: &str = r##"// C++ Example
#include <iostream>
#include <string>

std::string greet(const std::string& name) {
    return "Hello, " + name + "!";
}

int main() {
    std::cout << greet("World") << std::endl;
    return 0;
}"##;

const GO: &str = r#"// Go Example
package main

import "fmt"

func greet(name string) string {
    return fmt.Sprintf("Hello, %s!", name)
}

func main() {
    fmt.Println(greet("World"))
}"#;

const RUST: &str = r#"// Rust Example
fn greet(name: &str) -> String {
    format!("Hello, {}!", name)
}

fn main() {
    println!("{}", greet("World"));
}"#;

const RUBY: &str = r##"# Ruby Example
def greet(name)
  "Hello, #{name}!"
end

puts greet("World")"##;

const FALLBACK: &str = "// Start coding here";
