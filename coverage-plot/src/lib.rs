pub mod chart;
pub mod plot;
pub mod style;

/// `kamailio` => `Kamailio`
pub fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
