//! Built-in minifiers for JS and CSS.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Both register with low
//! priority so they run after any language converter producing `js`/`css`.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::{ConvertError, Converter, Priority};

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Result<String, ConvertError> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(ConvertError::failed(format!(
            "failed to parse JavaScript: {error}"
        )));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String, ConvertError> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| ConvertError::failed(format!("failed to parse CSS: {e}")))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| ConvertError::failed(format!("failed to print CSS: {e}")))?;
    Ok(result.code)
}

/// `js → js` minifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl Converter for JsMinifier {
    fn name(&self) -> &str {
        "minify-js"
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn matches(&self, ext: &str) -> bool {
        ext == "js"
    }

    fn output_ext(&self, _ext: &str) -> String {
        "js".to_string()
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConvertError> {
        minify_js(std::str::from_utf8(content)?).map(String::into_bytes)
    }
}

/// `css → css` minifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl Converter for CssMinifier {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn matches(&self, ext: &str) -> bool {
        ext == "css"
    }

    fn output_ext(&self, _ext: &str) -> String {
        "css".to_string()
    }

    fn convert(&self, content: &[u8]) -> Result<Vec<u8>, ConvertError> {
        minify_css(std::str::from_utf8(content)?).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js() {
        let source = "function add(first, second) {\n  return first + second;\n}\nexport { add };\n";
        let out = minify_js(source).unwrap();
        assert!(out.len() < source.len());
        assert!(out.contains("export"));
    }

    #[test]
    fn test_minify_js_syntax_error() {
        let err = minify_js("function (").unwrap_err();
        assert!(format!("{err}").contains("failed to parse JavaScript"));
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css("body {\n  color: #ff0000;\n  margin: 0px;\n}\n").unwrap();
        assert_eq!(out, "body{color:red;margin:0}");
    }

    #[test]
    fn test_minifier_rejects_binary() {
        let err = CssMinifier.convert(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ConvertError::Encoding(_)));
    }

    #[test]
    fn test_minifier_matching() {
        assert!(JsMinifier.matches("js"));
        assert!(!JsMinifier.matches("css"));
        assert!(CssMinifier.matches("css"));
        assert_eq!(CssMinifier.output_ext("css"), "css");
        assert_eq!(JsMinifier.priority(), Priority::Low);
    }
}
