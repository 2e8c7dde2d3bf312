//! Template maintenance jobs.
//!
//! A job takes one page and returns its new markup, or `None` when the page
//! needs no edit. Only the templates it touches are rewritten; the rest of the
//! page is copied through unchanged.

use crate::wikitext::errors::Result;
use crate::wikitext::types::templates::{
    NamedParams, Template, TemplateLayout, get_template_data, get_template_key_value_data,
    template_from_key_value_data, template_from_template_data,
};
use crate::wikitext::wiki_text::WikiText;

/// A text-to-text edit applied to every page of a batch.
pub trait Job: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    fn apply(&self, page: &WikiText) -> Result<Option<String>>;
}

/// Keep the layout a template was written in when it is rebuilt.
fn layout_of(raw: &str) -> TemplateLayout {
    if raw.contains("\n|") {
        TemplateLayout::Multiline
    } else {
        TemplateLayout::Inline
    }
}

/// Run `edit` over every `name` template of the page and splice the
/// replacements it returns back into the text.
fn rewrite_templates<F>(page: &WikiText, name: &str, mut edit: F) -> Result<Option<String>>
where
    F: FnMut(&Template, &str) -> Result<Option<String>>,
{
    let text = page.text();
    let mut edits = Vec::new();
    for template in page.templates(name) {
        let raw = template.raw(text);
        if let Some(replacement) = edit(&template, raw)?
            && replacement != raw
        {
            edits.push((template.span, replacement));
        }
    }
    if edits.is_empty() {
        return Ok(None);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (span, replacement) in &edits {
        out.push_str(&text[last..span.start]);
        out.push_str(replacement);
        last = span.end;
    }
    out.push_str(&text[last..]);
    log::debug!(
        "{}: rewrote {} '{}' template(s)",
        page.page_name().unwrap_or("<untitled>"),
        edits.len(),
        name
    );
    Ok(Some(out))
}

/// Drop parameter `key` from every `template` on the page.
pub fn remove_template_param(page: &WikiText, template: &str, key: &str) -> Result<Option<String>> {
    rewrite_templates(page, template, |found, raw| {
        let mut data = get_template_key_value_data(raw)?;
        if data.remove(key).is_none() {
            return Ok(None);
        }
        Ok(Some(template_from_key_value_data(&data, &found.name, layout_of(raw))))
    })
}

/// Rewrite one template into another: new name, renamed parameters, fixed
/// values, optionally without empty parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertTemplate {
    pub from: String,
    pub to: String,
    /// `(old, new)` parameter names. A missing old name is ignored.
    pub renames: Vec<(String, String)>,
    /// Parameters set (or overwritten) after renaming.
    pub set: NamedParams,
    pub drop_empty: bool,
}

impl ConvertTemplate {
    pub fn new<F: Into<String>, T: Into<String>>(from: F, to: T) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Self::default()
        }
    }

    pub fn rename<O: Into<String>, N: Into<String>>(mut self, old: O, new: N) -> Self {
        self.renames.push((old.into(), new.into()));
        self
    }

    pub fn set<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set.insert(key, value);
        self
    }

    pub fn drop_empty(mut self, drop_empty: bool) -> Self {
        self.drop_empty = drop_empty;
        self
    }

    fn convert(&self, data: &mut NamedParams) {
        for (old, new) in &self.renames {
            data.rename(old, new);
        }
        for (key, value) in self.set.iter() {
            data.insert(key, value);
        }
        if self.drop_empty {
            data.retain(|_, v| !v.is_empty());
        }
    }
}

pub fn convert_template(page: &WikiText, conversion: &ConvertTemplate) -> Result<Option<String>> {
    rewrite_templates(page, &conversion.from, |_, raw| {
        let mut data = get_template_key_value_data(raw)?;
        conversion.convert(&mut data);
        Ok(Some(template_from_key_value_data(&data, &conversion.to, layout_of(raw))))
    })
}

/// Swap two positional parameters (0-based) of every `template` on the
/// page. Templates with fewer positional parameters are left alone.
pub fn swap_positional_params(
    page: &WikiText,
    template: &str,
    first: usize,
    second: usize,
) -> Result<Option<String>> {
    rewrite_templates(page, template, |found, raw| {
        let mut data = get_template_data(raw)?;
        let len = data.positional.len();
        if first >= len || second >= len {
            log::debug!(
                "'{}' has {} positional parameter(s), not swapping {} and {}",
                found.name,
                len,
                first,
                second
            );
            return Ok(None);
        }
        data.positional.swap(first, second);
        Ok(Some(template_from_template_data(&data, &found.name)))
    })
}

/// `Job` form of `remove_template_param`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveTemplateParam {
    pub template: String,
    pub key: String,
}

impl Job for RemoveTemplateParam {
    fn name(&self) -> &str {
        "remove_template_param"
    }

    fn apply(&self, page: &WikiText) -> Result<Option<String>> {
        remove_template_param(page, &self.template, &self.key)
    }
}

impl Job for ConvertTemplate {
    fn name(&self) -> &str {
        "convert_template"
    }

    fn apply(&self, page: &WikiText) -> Result<Option<String>> {
        convert_template(page, self)
    }
}

/// `Job` form of `swap_positional_params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPositionalParams {
    pub template: String,
    pub first: usize,
    pub second: usize,
}

impl Job for SwapPositionalParams {
    fn name(&self) -> &str {
        "swap_positional_params"
    }

    fn apply(&self, page: &WikiText) -> Result<Option<String>> {
        swap_positional_params(page, &self.template, self.first, self.second)
    }
}
