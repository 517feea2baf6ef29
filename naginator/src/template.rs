// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Fact templates such as `{operatingsystem}_{role}`.
//!
//! A template is parsed once into literal and placeholder segments and then
//! evaluated per host against that host's facts. `{{` and `}}` produce
//! literal braces. Evaluation never substitutes defaults: every placeholder
//! without a matching fact is reported back to the caller.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::Error,
    model::{Facts, fact_text},
};

static TOKEN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]",).expect("valid template token regex",)
},);

#[derive(Debug, Clone, PartialEq, Eq,)]
enum Segment
{
    Literal(String,),
    Fact(String,),
}

/// Parsed fact template.
///
/// # Examples
///
/// ```
/// use naginator::{Facts, Template};
///
/// let template = Template::parse("{operatingsystem}_{role}",)?;
/// let mut facts = Facts::new();
/// facts.insert("operatingsystem".to_owned(), "Debian".into(),);
/// facts.insert("role".to_owned(), "web".into(),);
/// assert_eq!(template.render(&facts,), Ok("Debian_web".to_owned()));
/// # Ok::<(), naginator::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Template
{
    source:   String,
    segments: Vec<Segment,>,
}

impl Template
{
    /// Parses `source` into literal and placeholder segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) for an unmatched
    /// brace or an empty placeholder.
    pub fn parse(source: &str,) -> Result<Self, Error,>
    {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut cursor = 0;

        for captures in TOKEN.captures_iter(source,) {
            let Some(token,) = captures.get(0,) else {
                continue;
            };
            literal.push_str(&source[cursor..token.start()],);
            cursor = token.end();

            match token.as_str() {
                "{{" => literal.push('{',),
                "}}" => literal.push('}',),
                "{" | "}" => {
                    return Err(Error::validation(format!(
                        "unmatched brace at offset {} in template '{source}'",
                        token.start()
                    ),),);
                }
                _ => {
                    let name = captures.get(1,).map_or("", |name| name.as_str(),).trim();
                    if name.is_empty() {
                        return Err(Error::validation(format!(
                            "empty placeholder in template '{source}'"
                        ),),);
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal,),),);
                    }
                    segments.push(Segment::Fact(name.to_owned(),),);
                }
            }
        }

        literal.push_str(&source[cursor..],);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal,),);
        }

        Ok(Self {
            source: source.to_owned(),
            segments,
        },)
    }

    /// Original template text.
    pub fn source(&self,) -> &str
    {
        &self.source
    }

    /// Fact names referenced by the template, in order of appearance.
    pub fn facts(&self,) -> impl Iterator<Item = &str,>
    {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Fact(name,) => Some(name.as_str(),),
            Segment::Literal(_,) => None,
        },)
    }

    /// Expands the template with `facts` as the substitution context.
    ///
    /// # Errors
    ///
    /// Returns every referenced fact name absent from `facts`, deduplicated
    /// and in order of first appearance.
    pub fn render(&self, facts: &Facts,) -> Result<String, Vec<String,>,>
    {
        let mut output = String::with_capacity(self.source.len(),);
        let mut missing: Vec<String,> = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text,) => output.push_str(text,),
                Segment::Fact(name,) => match facts.get(name,) {
                    Some(value,) => output.push_str(&fact_text(value,),),
                    None => {
                        if !missing.iter().any(|known| known == name,) {
                            missing.push(name.clone(),);
                        }
                    }
                },
            }
        }

        if missing.is_empty() { Ok(output,) } else { Err(missing,) }
    }

    /// Expands the template for `host`, converting missing facts into
    /// [`Error::MissingFact`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFact`] naming the host, the template and the
    /// absent facts.
    pub fn render_for(&self, host: &str, facts: &Facts,) -> Result<String, Error,>
    {
        self.render(facts,).map_err(|missing| Error::MissingFact {
            host:     host.to_owned(),
            template: self.source.clone(),
            facts:    missing,
        },)
    }
}
