use crate::types::GroceryCategory;

use super::units::singularize;

// Checked top to bottom; specific phrases sit above the generic words they contain
// ("coconut milk" before "milk", "garlic powder" before "garlic").
#[rustfmt::skip]
const KEYWORDS: &[(GroceryCategory, &[&str])] = &[
    (GroceryCategory::Frozen, &["frozen", "ice cream", "puff pastry"]),
    (GroceryCategory::CannedJarred, &[
        "broth", "stock", "canned", "coconut milk", "tomato paste", "tomato sauce", "crushed tomato",
        "diced tomato", "salsa", "marinara", "chickpea", "black bean", "kidney bean", "cannellini",
        "pinto bean", "refried bean", "kalamata", "green olive", "black olive", "caper", "pickle", "artichoke heart", "curry paste",
    ]),
    (GroceryCategory::SpicesSeasonings, &[
        "salt", "black pepper", "peppercorn", "pepper flake", "chili powder", "chile powder",
        "cumin", "paprika", "oregano", "thyme", "cinnamon", "nutmeg", "turmeric", "garam masala",
        "curry powder", "garlic powder", "onion powder", "cayenne", "bay leaf", "bay leaves",
        "seasoning", "coriander", "ground clove", "whole clove", "allspice", "italian seasoning", "red pepper flake", "dried",
        "vanilla", "za'atar", "sumac", "five spice",
    ]),
    (GroceryCategory::Pantry, &[
        "oil", "vinegar", "flour", "sugar", "honey", "maple syrup", "soy sauce", "tamari",
        "fish sauce", "worcestershire", "hot sauce", "sriracha", "mustard", "ketchup", "mayonnaise",
        "mayo", "peanut butter", "tahini", "baking powder", "baking soda", "cornstarch", "yeast",
        "breadcrumb", "panko", "nut", "almond", "walnut", "pecan", "cashew", "sesame seed",
        "chocolate", "cocoa", "raisin", "water", "miso", "hoisin", "gochujang", "jam",
    ]),
    (GroceryCategory::GrainsPasta, &[
        "rice", "pasta", "spaghetti", "penne", "fettuccine", "linguine", "macaroni", "noodle",
        "lasagna", "orzo", "quinoa", "couscous", "oat", "barley", "farro", "bulgur", "polenta",
        "tortellini", "ravioli", "gnocchi", "lentil",
    ]),
    (GroceryCategory::Bakery, &[
        "bread", "tortilla", "bun", "pita", "naan", "baguette", "roll", "bagel", "croissant",
        "ciabatta", "flatbread", "taco shell",
    ]),
    (GroceryCategory::DairyEggs, &[
        "milk", "cheese", "butter", "cream", "yogurt", "yoghurt", "egg", "parmesan", "mozzarella",
        "cheddar", "feta", "ricotta", "ghee", "half and half", "buttermilk",
    ]),
    (GroceryCategory::MeatSeafood, &[
        "chicken", "beef", "pork", "lamb", "turkey", "bacon", "sausage", "ham", "steak", "shrimp",
        "prawn", "salmon", "tuna", "cod", "tilapia", "fish", "crab", "scallop", "mussel", "clam",
        "chorizo", "prosciutto", "pancetta", "veal", "duck", "ground meat", "tofu", "tempeh",
    ]),
    (GroceryCategory::Produce, &[
        "onion", "garlic", "tomato", "potato", "carrot", "celery", "pepper", "lettuce", "spinach",
        "kale", "cabbage", "broccoli", "cauliflower", "zucchini", "squash", "cucumber", "mushroom",
        "avocado", "lemon", "lime", "orange", "apple", "banana", "berry", "ginger", "scallion",
        "shallot", "leek", "cilantro", "parsley", "basil", "mint", "dill", "rosemary", "sage",
        "chive", "jalapeno", "jalapeño", "corn", "pea", "green bean", "asparagus", "eggplant",
        "sweet potato", "arugula", "radish", "beet", "mango", "pineapple", "grape", "herb",
        "bok choy", "fennel", "chile", "chili",
    ]),
];

/// Guess the store section for an ingredient name by keyword.
pub fn categorize(name: &str) -> GroceryCategory {
    let lowered = name.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return GroceryCategory::Other;
    }
    // Match against both the raw words and their singular forms.
    let raw = format!(" {} ", words.join(" "));
    let singular = format!(
        " {} ",
        words.iter().map(|w| singularize(w)).collect::<Vec<_>>().join(" ")
    );

    KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|kw| {
                let needle = format!(" {kw} ");
                singular.contains(&needle) || raw.contains(&needle)
            })
        })
        .map(|(category, _)| *category)
        .unwrap_or(GroceryCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_phrases_win_over_generic_words() {
        assert_eq!(categorize("coconut milk"), GroceryCategory::CannedJarred);
        assert_eq!(categorize("whole milk"), GroceryCategory::DairyEggs);
        assert_eq!(categorize("garlic powder"), GroceryCategory::SpicesSeasonings);
        assert_eq!(categorize("Garlic"), GroceryCategory::Produce);
        assert_eq!(categorize("chicken broth"), GroceryCategory::CannedJarred);
        assert_eq!(categorize("boneless chicken thighs"), GroceryCategory::MeatSeafood);
        assert_eq!(categorize("peanut butter"), GroceryCategory::Pantry);
    }

    #[test]
    fn plurals_and_fallback() {
        assert_eq!(categorize("Roma Tomatoes"), GroceryCategory::Produce);
        assert_eq!(categorize("frozen peas"), GroceryCategory::Frozen);
        assert_eq!(categorize("extra-virgin olive oil"), GroceryCategory::Pantry);
        assert_eq!(categorize("garlic cloves, minced"), GroceryCategory::Produce);
        assert_eq!(categorize("bay leaves"), GroceryCategory::SpicesSeasonings);
        assert_eq!(categorize("spaghetti"), GroceryCategory::GrainsPasta);
        assert_eq!(categorize("mystery ingredient"), GroceryCategory::Other);
        assert_eq!(categorize(""), GroceryCategory::Other);
    }
}
