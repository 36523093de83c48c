pub const ANALYST_SYSTEM: &str = include_str!("../data/prompts/analyst_system.txt");
pub const CLASSIFY_USER: &str = include_str!("../data/prompts/classify_user.txt");
pub const LABEL_USER: &str = include_str!("../data/prompts/label_user.txt");
pub const MENU_USER: &str = include_str!("../data/prompts/menu_user.txt");
pub const GEOMETRY_USER: &str = include_str!("../data/prompts/geometry_user.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Append the caller's region hint, if any, to a user instruction.
pub fn with_region(user: String, region: Option<&str>) -> String {
    match region.map(str::trim).filter(|r| !r.is_empty()) {
        Some(region) => format!(
            "{}\nThe photo was taken in region '{}'; prefer that region's portion sizes and menus.",
            user.trim_end(),
            region
        ),
        None => user,
    }
}
