//! Resource and endpoint naming.
//!
//! A type named `BlogPost` is addressed as the resource `blog_post` and the
//! endpoint `blog_posts`. Irregular plurals are supplied through
//! [`ResourceConfig`](crate::config::ResourceConfig).

/// Converts a camel-cased type name into its snake-cased resource name.
pub fn decamelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut after_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if after_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            after_lower = false;
        } else {
            out.push(ch);
            after_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Default English pluralisation for endpoint names.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        let after_vowel = stem.ends_with(|c: char| "aeiou".contains(c));
        if !stem.is_empty() && !after_vowel {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| name.ends_with(s)) {
        return format!("{name}es");
    }
    format!("{name}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decamelize() {
        assert_eq!(decamelize("Post"), "post");
        assert_eq!(decamelize("BlogPost"), "blog_post");
        assert_eq!(decamelize("Post2Comment"), "post2_comment");
        assert_eq!(decamelize("already_snake"), "already_snake");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("post"), "posts");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
    }
}
