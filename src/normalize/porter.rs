//! Classic Porter (1980) stemmer in the variant `nltk.stem.PorterStemmer()`
//! uses by default, so query tokens line up with label-model training text.
//!
//! Differences from the published algorithm: a small table of irregular forms,
//! words of one or two letters pass through, `ies`/`ied` on four-letter words
//! keep the `e`, `y` only becomes `i` after a consonant that is not the first
//! letter, `alli` is rewritten before the rest of step 2, and step 2 also
//! handles `fulli` and `logi`.

type Condition = fn(&str) -> bool;

const IRREGULAR_FORMS: [(&str, &str); 16] = [
    ("sky", "sky"),
    ("skies", "sky"),
    ("dying", "die"),
    ("lying", "lie"),
    ("tying", "tie"),
    ("news", "news"),
    ("innings", "inning"),
    ("inning", "inning"),
    ("outings", "outing"),
    ("outing", "outing"),
    ("cannings", "canning"),
    ("canning", "canning"),
    ("howe", "howe"),
    ("proceed", "proceed"),
    ("exceed", "exceed"),
    ("succeed", "succeed"),
];

/// Stem one lowercase ASCII word. Anything else is returned unchanged.
pub fn stem(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    if let Some((_, base)) = IRREGULAR_FORMS.iter().find(|(form, _)| *form == word) {
        return base.to_string();
    }
    if word.len() <= 2 {
        return word.to_string();
    }

    let word = step1a(word);
    let word = step1b(&word);
    let word = step1c(&word);
    let word = step2(&word);
    let word = step3(&word);
    let word = step4(&word);
    let word = step5a(&word);
    step5b(&word)
}

fn is_consonant(word: &[u8], i: usize) -> bool {
    match word[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(word, i - 1),
        _ => true,
    }
}

/// Number of vowel-to-consonant transitions, the `m` of `[C](VC)^m[V]`.
fn measure(stem: &str) -> usize {
    let bytes = stem.as_bytes();
    let mut count = 0;
    let mut after_vowel = false;
    for i in 0..bytes.len() {
        let consonant = is_consonant(bytes, i);
        if consonant && after_vowel {
            count += 1;
        }
        after_vowel = !consonant;
    }
    count
}

fn contains_vowel(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    (0..bytes.len()).any(|i| !is_consonant(bytes, i))
}

fn ends_double_consonant(word: &str) -> bool {
    let bytes = word.as_bytes();
    let n = bytes.len();
    n >= 2 && bytes[n - 1] == bytes[n - 2] && is_consonant(bytes, n - 1)
}

fn ends_cvc(word: &str) -> bool {
    let bytes = word.as_bytes();
    let n = bytes.len();
    if n >= 3 {
        is_consonant(bytes, n - 3)
            && !is_consonant(bytes, n - 2)
            && is_consonant(bytes, n - 1)
            && !matches!(bytes[n - 1], b'w' | b'x' | b'y')
    } else {
        n == 2 && !is_consonant(bytes, 0) && is_consonant(bytes, 1)
    }
}

fn always(_: &str) -> bool {
    true
}

fn positive_measure(stem: &str) -> bool {
    measure(stem) > 0
}

fn measure_above_one(stem: &str) -> bool {
    measure(stem) > 1
}

fn ion_removable(stem: &str) -> bool {
    measure(stem) > 1 && (stem.ends_with('s') || stem.ends_with('t'))
}

/// The first rule whose suffix matches decides: replace if its condition
/// holds on the remaining stem, otherwise leave the word alone.
fn apply_rules(word: &str, rules: &[(&str, &str, Condition)]) -> String {
    for &(suffix, replacement, condition) in rules {
        if let Some(stem) = word.strip_suffix(suffix) {
            return if condition(stem) {
                format!("{stem}{replacement}")
            } else {
                word.to_string()
            };
        }
    }
    word.to_string()
}

fn step1a(word: &str) -> String {
    if word.len() == 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{stem}ie");
        }
    }
    apply_rules(
        word,
        &[
            ("sses", "ss", always),
            ("ies", "i", always),
            ("ss", "ss", always),
            ("s", "", always),
        ],
    )
}

fn step1b(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ied") {
        return if word.len() == 4 {
            format!("{stem}ie")
        } else {
            format!("{stem}i")
        };
    }

    if let Some(stem) = word.strip_suffix("eed") {
        return if measure(stem) > 0 {
            format!("{stem}ee")
        } else {
            word.to_string()
        };
    }

    let Some(stem) = ["ed", "ing"]
        .iter()
        .find_map(|suffix| word.strip_suffix(*suffix).filter(|s| contains_vowel(s)))
    else {
        return word.to_string();
    };

    for (suffix, replacement) in [("at", "ate"), ("bl", "ble"), ("iz", "ize")] {
        if let Some(base) = stem.strip_suffix(suffix) {
            return format!("{base}{replacement}");
        }
    }
    if ends_double_consonant(stem) {
        return if stem.ends_with(|c| matches!(c, 'l' | 's' | 'z')) {
            stem.to_string()
        } else {
            stem[..stem.len() - 1].to_string()
        };
    }
    if measure(stem) == 1 && ends_cvc(stem) {
        return format!("{stem}e");
    }
    stem.to_string()
}

fn step1c(word: &str) -> String {
    match word.strip_suffix('y') {
        Some(stem) if stem.len() > 1 && is_consonant(stem.as_bytes(), stem.len() - 1) => {
            format!("{stem}i")
        }
        _ => word.to_string(),
    }
}

fn step2(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("alli") {
        if positive_measure(stem) {
            return step2(&format!("{stem}al"));
        }
    }
    // The `l` of `logi` counts toward the stem so short stems like `geo` qualify.
    if let Some(stem) = word.strip_suffix("logi") {
        return if positive_measure(&word[..word.len() - 3]) {
            format!("{stem}log")
        } else {
            word.to_string()
        };
    }

    apply_rules(
        word,
        &[
            ("ational", "ate", positive_measure),
            ("tional", "tion", positive_measure),
            ("enci", "ence", positive_measure),
            ("anci", "ance", positive_measure),
            ("izer", "ize", positive_measure),
            ("bli", "ble", positive_measure),
            ("alli", "al", positive_measure),
            ("entli", "ent", positive_measure),
            ("eli", "e", positive_measure),
            ("ousli", "ous", positive_measure),
            ("ization", "ize", positive_measure),
            ("ation", "ate", positive_measure),
            ("ator", "ate", positive_measure),
            ("alism", "al", positive_measure),
            ("iveness", "ive", positive_measure),
            ("fulness", "ful", positive_measure),
            ("ousness", "ous", positive_measure),
            ("aliti", "al", positive_measure),
            ("iviti", "ive", positive_measure),
            ("biliti", "ble", positive_measure),
            ("fulli", "ful", positive_measure),
        ],
    )
}

fn step3(word: &str) -> String {
    apply_rules(
        word,
        &[
            ("icate", "ic", positive_measure),
            ("ative", "", positive_measure),
            ("alize", "al", positive_measure),
            ("iciti", "ic", positive_measure),
            ("ical", "ic", positive_measure),
            ("ful", "", positive_measure),
            ("ness", "", positive_measure),
        ],
    )
}

fn step4(word: &str) -> String {
    apply_rules(
        word,
        &[
            ("al", "", measure_above_one),
            ("ance", "", measure_above_one),
            ("ence", "", measure_above_one),
            ("er", "", measure_above_one),
            ("ic", "", measure_above_one),
            ("able", "", measure_above_one),
            ("ible", "", measure_above_one),
            ("ant", "", measure_above_one),
            ("ement", "", measure_above_one),
            ("ment", "", measure_above_one),
            ("ent", "", measure_above_one),
            ("ion", "", ion_removable),
            ("ou", "", measure_above_one),
            ("ism", "", measure_above_one),
            ("ate", "", measure_above_one),
            ("iti", "", measure_above_one),
            ("ous", "", measure_above_one),
            ("ive", "", measure_above_one),
            ("ize", "", measure_above_one),
        ],
    )
}

fn step5a(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('e') {
        let m = measure(stem);
        if m > 1 || (m == 1 && !ends_cvc(stem)) {
            return stem.to_string();
        }
    }
    word.to_string()
}

fn step5b(word: &str) -> String {
    if word.ends_with("ll") && measure(&word[..word.len() - 1]) > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
