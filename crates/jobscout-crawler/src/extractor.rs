//! Field extraction with compiled selector rules.
//!
//! Rules come from the site definition as strings and are compiled to
//! [`scraper::Selector`]s once per run. Evaluation is pure: a rule either
//! yields a non-blank trimmed value or misses, and a field whose rules all
//! miss gets its sentinel.

use crate::error::{CrawlError, Result};
use jobscout_core::JobField;
use jobscout_site::{RuleTarget, SelectorRule, SiteDefinition};
use scraper::{ElementRef, Selector};

/// A selector rule ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    selector: Selector,
    target: RuleTarget,
    source: String,
}

impl CompiledRule {
    /// Compile one rule.
    pub fn compile(rule: &SelectorRule) -> Result<Self> {
        let selector = compile_selector(rule.css(), rule.as_str())?;
        Ok(Self {
            selector,
            target: rule.target().clone(),
            source: rule.as_str().to_string(),
        })
    }

    /// The rule as written in the site definition.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against the descendants of `scope`.
    ///
    /// Matches are visited in document order and the first one producing a
    /// non-blank value wins.
    #[must_use]
    pub fn extract(&self, scope: ElementRef<'_>) -> Option<String> {
        scope
            .select(&self.selector)
            .find_map(|element| read_target(element, &self.target))
    }
}

fn read_target(element: ElementRef<'_>, target: &RuleTarget) -> Option<String> {
    match target {
        RuleTarget::OwnText => element
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
            .map(ToString::to_string),
        RuleTarget::Text => {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!collapsed.is_empty()).then_some(collapsed)
        }
        RuleTarget::Attr(name) => element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string),
    }
}

fn compile_selector(css: &str, rule: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::Selector {
        rule: rule.to_string(),
        reason: e.to_string(),
    })
}

/// An ordered rule list for one field.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    rules: Vec<CompiledRule>,
}

impl CompiledRules {
    /// Compile every rule in order.
    pub fn compile(rules: &[SelectorRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Whether the list has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First non-empty match, trying rules left to right.
    #[must_use]
    pub fn extract_first(&self, scope: ElementRef<'_>) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.extract(scope))
    }

    /// First match, or the field's sentinel when every rule misses.
    #[must_use]
    pub fn extract_or_sentinel(&self, scope: ElementRef<'_>, field: JobField) -> String {
        field.value_or_sentinel(self.extract_first(scope).as_deref())
    }
}

/// Every rule of a site definition, compiled.
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Listing item fragments
    pub item: Selector,
    /// Title rules
    pub title: CompiledRules,
    /// Detail link rules
    pub url: CompiledRules,
    /// Company rules
    pub company: CompiledRules,
    /// Location rules
    pub location: CompiledRules,
    /// Description rules
    pub description: CompiledRules,
    /// Next page link rules
    pub next: CompiledRules,
    /// Detail page salary rules
    pub salary: CompiledRules,
}

impl SiteRules {
    /// Compile all rules of `site`. Any invalid selector fails the whole set.
    pub fn compile(site: &SiteDefinition) -> Result<Self> {
        let fields = &site.listing.fields;
        Ok(Self {
            item: compile_selector(&site.listing.item, &site.listing.item)?,
            title: CompiledRules::compile(&fields.title)?,
            url: CompiledRules::compile(&fields.url)?,
            company: CompiledRules::compile(&fields.company)?,
            location: CompiledRules::compile(&fields.location)?,
            description: CompiledRules::compile(&fields.description)?,
            next: CompiledRules::compile(&site.pagination.next)?,
            salary: CompiledRules::compile(&site.detail.salary)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn rules(rules: &[&str]) -> CompiledRules {
        let parsed: Vec<SelectorRule> = rules
            .iter()
            .map(|r| r.parse().expect("valid rule"))
            .collect();
        CompiledRules::compile(&parsed).expect("compile rules")
    }

    fn fragment(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    #[test]
    fn test_own_text_skips_descendants() {
        let html = fragment(r#"<div class="t"><span>nested</span>  Own text  </div>"#);
        let value = rules(&["div.t::text"]).extract_first(html.root_element());
        assert_eq!(value.as_deref(), Some("Own text"));
    }

    #[test]
    fn test_own_text_uses_first_element_with_text() {
        let html = fragment(r"<p> </p><p><b>bold</b></p><p>second</p>");
        let value = rules(&["p::text"]).extract_first(html.root_element());
        assert_eq!(value.as_deref(), Some("second"));
    }

    #[test]
    fn test_plain_selector_reads_collapsed_text() {
        let html = fragment("<div class=\"d\">Build <b>great</b>\n\n   things</div>");
        let value = rules(&["div.d"]).extract_first(html.root_element());
        assert_eq!(value.as_deref(), Some("Build great things"));
    }

    #[test]
    fn test_attribute_rule() {
        let html = fragment(r#"<a class="x">no link</a><a class="x" href=" /job/1 ">Job</a>"#);
        let value = rules(&["a.x::attr(href)"]).extract_first(html.root_element());
        assert_eq!(value.as_deref(), Some("/job/1"));
    }

    #[test]
    fn test_fallback_rules_in_order() {
        let html = fragment(r#"<div class="company"><span>Acme</span></div>"#);
        let company = rules(&[
            r#"a[data-automation="jobCompany"]::text"#,
            r#"div[class*="company"] span::text"#,
        ]);
        assert_eq!(company.extract_first(html.root_element()).as_deref(), Some("Acme"));
    }

    #[test]
    fn test_selector_group_rule() {
        let html = fragment("<p>Summary paragraph</p>");
        let value = rules(&["div._1q03wcw4::text, p::text"]).extract_first(html.root_element());
        assert_eq!(value.as_deref(), Some("Summary paragraph"));
    }

    #[test]
    fn test_miss_yields_sentinel() {
        let html = fragment("<div>nothing useful</div>");
        let root = html.root_element();
        assert_eq!(rules(&["h3::text"]).extract_or_sentinel(root, JobField::Title), "Not found");
        assert_eq!(
            rules(&[".salary::text"]).extract_or_sentinel(root, JobField::Salary),
            "Not listed"
        );
        assert_eq!(CompiledRules::default().extract_or_sentinel(root, JobField::Url), "Not found");
    }

    #[test]
    fn test_invalid_selector_is_compile_error() {
        let rule: SelectorRule = "p:no-such-pseudo::text".parse().expect("rule parses");
        let err = CompiledRules::compile(&[rule]).unwrap_err();
        assert!(matches!(err, CrawlError::Selector { .. }));
    }
}
