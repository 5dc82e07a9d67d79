//! Default naming conventions
//!
//! Pure functions deriving table, foreign-key and pivot-table names from a
//! model's declared type name. Models can override every one of them.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "media", "metadata", "news", "series", "sheep", "species"];

/// `BlogPost` -> `blog_post`
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && !out.ends_with('_') && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out
}

/// English plural of a single lower-case word
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }

    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }

    let ends_with_consonant_y = word.ends_with('y')
        && word
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| !"aeiou".contains(c));

    if ends_with_consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// Default table name: snake case with the last word pluralized
pub fn table_name(model_name: &str) -> String {
    let snake = snake_case(model_name);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Default foreign key pointing at a model: `User` -> `user_id`
pub fn foreign_key(model_name: &str) -> String {
    format!("{}_id", snake_case(model_name))
}

/// Default pivot table joining two models: singular snake names in alphabetical order
pub fn pivot_table(first_model: &str, second_model: &str) -> String {
    let mut names = [snake_case(first_model), snake_case(second_model)];
    names.sort();
    names.join("_")
}
