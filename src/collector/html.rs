//! Embedded-HTML stripping for converted notebooks
//!
//! Notebook conversion leaves rendered dataframe output behind as HTML `<div>`
//! blocks, which add nothing to the index. Stripping uses a single greedy
//! dot-matches-newline match, so nested divs collapse to the outermost pair.

use regex::Regex;
use std::sync::LazyLock;

static DIV_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<div>.*</div>").expect("div pattern must compile"));

/// Remove everything between the first `<div>` and the last `</div>`.
pub fn strip_html_blocks(content: &str) -> String {
    DIV_BLOCK.replace_all(content, "").into_owned()
}
