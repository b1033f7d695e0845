use crate::catalog::Product;
use crate::llm::Generation;

/// Turn completion generations into the answer texts returned to the client.
///
/// Blank generations are dropped. In the rest, every literal occurrence of a
/// catalog product name is replaced by the product's `{{name|id}}` marker,
/// walking the catalog in order. Later replacements see the output of earlier
/// ones, so a name that is a substring of another (or of a marker) depends on
/// catalog order.
pub fn annotate(generations: &[Generation], catalog: &[Product]) -> Vec<String> {
    generations
        .iter()
        .filter_map(|g| g.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .map(|text| annotate_text(text, catalog))
        .collect()
}

fn annotate_text(text: &str, catalog: &[Product]) -> String {
    catalog
        .iter()
        // an empty pattern would match between every character
        .filter(|product| !product.name.is_empty())
        .fold(text.to_string(), |acc, product| {
            acc.replace(&product.name, &product.marker())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            tags: Vec::new(),
            short_description: String::new(),
            full_description: String::new(),
        }
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let catalog = vec![product("Yoga Mat", "p1")];
        let out = annotate(
            &[Generation::text("The Yoga Mat is great. Buy a Yoga Mat!")],
            &catalog,
        );
        assert_eq!(out, vec!["The {{Yoga Mat|p1}} is great. Buy a {{Yoga Mat|p1}}!"]);
    }

    #[test]
    fn test_drops_empty_and_blank_generations() {
        let generations = vec![
            Generation { text: None },
            Generation::text(""),
            Generation::text("   \n"),
            Generation::text("Hello"),
        ];
        assert_eq!(annotate(&generations, &[]), vec!["Hello"]);
    }

    #[test]
    fn test_keeps_generation_order() {
        let generations = vec![Generation::text("first"), Generation::text("second")];
        assert_eq!(annotate(&generations, &[]), vec!["first", "second"]);
    }

    #[test]
    fn test_longer_name_first_gets_nested_marker() {
        let catalog = vec![product("Widget A", "1"), product("Widget", "2")];
        let out = annotate(&[Generation::text("I love Widget A")], &catalog);
        assert_eq!(out, vec!["I love {{{{Widget|2}} A|1}}"]);
    }

    #[test]
    fn test_shorter_name_first_hides_longer_name() {
        let catalog = vec![product("Widget", "2"), product("Widget A", "1")];
        let out = annotate(&[Generation::text("I love Widget A")], &catalog);
        assert_eq!(out, vec!["I love {{Widget|2}} A"]);
    }

    #[test]
    fn test_empty_product_name_is_ignored() {
        let catalog = vec![product("", "0"), product("Tent", "t")];
        let out = annotate(&[Generation::text("A Tent")], &catalog);
        assert_eq!(out, vec!["A {{Tent|t}}"]);
    }

    #[test]
    fn test_text_without_names_is_unchanged() {
        let catalog = vec![product("Tent", "t")];
        let out = annotate(&[Generation::text("Nothing to see")], &catalog);
        assert_eq!(out, vec!["Nothing to see"]);
    }
}
