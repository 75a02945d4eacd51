// <block name="api" affects="README.md:usage">
pub fn check() {}
// </block>

pub const LEVELS: &[&str] = &[
    // <block line-pattern='"[a-z]+",' keep-sorted>
    "error",
    "info",
    "warning",
    // </block>
];
