use crate::operator::Operator;
use crate::plan::QueryPlan;
use ptree::print_config::UTF_CHARS;
use ptree::{write_tree_with, PrintConfig, Style, TreeItem};
use std::borrow::Cow;
use std::default::Default;
use std::io::{BufWriter, Write};

impl<'a, 'b> TreeItem for &'b Operator<'a> {
    type Child = Self;

    fn write_self<W: Write>(&self, f: &mut W, style: &Style) -> std::io::Result<()> {
        write!(f, "{}", style.paint(self))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(self.inputs())
    }
}

pub fn explain<W: Write>(plan: &QueryPlan<'_>, output: &mut W) -> std::io::Result<()> {
    let config = PrintConfig {
        indent: 3,
        characters: UTF_CHARS.into(),
        ..Default::default()
    };
    write_tree_with(&plan.root(), output, &config)
}

pub fn explain_to_string(plan: &QueryPlan<'_>) -> std::io::Result<String> {
    let mut buf = BufWriter::new(Vec::new());
    explain(plan, &mut buf)?;

    let bytes = buf.into_inner()?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
