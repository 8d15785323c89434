//! Travel Catalog
//!
//! Static demo data behind the travel tools. Lookups match case-insensitively
//! on a key contained in the caller's text ("Paris, France" matches "paris").

/// Destinations offered when the user has no preference
pub const DESTINATIONS: [&str; 10] = [
    "Paris, France",
    "Tokyo, Japan",
    "New York, USA",
    "Sydney, Australia",
    "Rome, Italy",
    "Barcelona, Spain",
    "Cape Town, South Africa",
    "Rio de Janeiro, Brazil",
    "Bangkok, Thailand",
    "Vancouver, Canada",
];

/// Current conditions for a known city
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Weather {
    pub condition: &'static str,
    pub temp_c: i32,
    pub temp_f: i32,
}

const WEATHER: [(&str, Weather); 10] = [
    ("paris", weather("Cloudy", 18, 64)),
    ("tokyo", weather("Sunny", 24, 75)),
    ("new york", weather("Rainy", 15, 59)),
    ("sydney", weather("Sunny", 28, 82)),
    ("rome", weather("Clear", 22, 72)),
    ("barcelona", weather("Sunny", 26, 79)),
    ("cape town", weather("Windy", 19, 66)),
    ("rio", weather("Hot and humid", 32, 90)),
    ("bangkok", weather("Tropical", 33, 91)),
    ("vancouver", weather("Overcast", 12, 54)),
];

const fn weather(condition: &'static str, temp_c: i32, temp_f: i32) -> Weather {
    Weather {
        condition,
        temp_c,
        temp_f,
    }
}

/// Highlights for a destination
#[derive(Clone, Copy, Debug)]
pub struct DestinationInfo {
    pub attractions: &'static str,
    pub cuisine: &'static str,
    pub tips: &'static str,
}

const INFO: [(&str, DestinationInfo); 3] = [
    (
        "paris",
        DestinationInfo {
            attractions: "Eiffel Tower, Louvre Museum, Notre-Dame Cathedral, Champs-Élysées",
            cuisine: "Croissants, French onion soup, coq au vin, macarons",
            tips: "The Metro is efficient, book museums in advance, tip 10-15%",
        },
    ),
    (
        "tokyo",
        DestinationInfo {
            attractions: "Senso-ji Temple, Shibuya Crossing, Tokyo Tower, Akihabara",
            cuisine: "Sushi, ramen, tempura, wagyu beef",
            tips: "Get a Suica card, bow when greeting, remove shoes indoors",
        },
    ),
    (
        "rome",
        DestinationInfo {
            attractions: "Colosseum, Vatican City, Trevi Fountain, Pantheon",
            cuisine: "Carbonara, pizza al taglio, tiramisu",
            tips: "Book the Vatican in advance, carry a water bottle, expect a siesta 1-4pm",
        },
    ),
];

fn lookup<T: Copy>(table: &[(&str, T)], text: &str) -> Option<T> {
    let text = text.to_lowercase();
    table
        .iter()
        .find(|(key, _)| text.contains(key))
        .map(|&(_, value)| value)
}

pub fn weather_for(location: &str) -> Option<Weather> {
    lookup(&WEATHER, location)
}

pub fn info_for(destination: &str) -> Option<DestinationInfo> {
    lookup(&INFO, destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_lookup_is_fuzzy() {
        assert_eq!(weather_for("Tokyo, Japan").unwrap().temp_c, 24);
        assert_eq!(weather_for("RIO DE JANEIRO").unwrap().condition, "Hot and humid");
        assert!(weather_for("Reykjavik").is_none());
    }

    #[test]
    fn test_every_destination_has_weather() {
        for destination in DESTINATIONS {
            assert!(weather_for(destination).is_some(), "{destination}");
        }
    }

    #[test]
    fn test_info_lookup() {
        assert!(info_for("Rome, Italy").unwrap().attractions.contains("Colosseum"));
        assert!(info_for("Lima").is_none());
    }
}
