//! Fixed pools the traffic generator samples from: storefront products,
//! shoppers, browsers and public IPs, plus ad-network click id formats.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use relay_core::EventName;

pub const SITE_URL: &str = "https://snoocommerce.onrender.com";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogProduct {
    pub id: u32,
    pub name: &'static str,
    pub price: f64,
}

pub const PRODUCTS: [CatalogProduct; 6] = [
    CatalogProduct { id: 1, name: "Wireless Headphones", price: 79.99 },
    CatalogProduct { id: 2, name: "Minimalist Watch", price: 149.99 },
    CatalogProduct { id: 3, name: "Running Sneakers", price: 119.99 },
    CatalogProduct { id: 4, name: "Leather Backpack", price: 89.99 },
    CatalogProduct { id: 5, name: "Ceramic Mug Set", price: 34.99 },
    CatalogProduct { id: 6, name: "Desk Lamp", price: 59.99 },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shopper {
    pub email: &'static str,
    pub phone: &'static str,
}

pub const SHOPPERS: [Shopper; 8] = [
    Shopper { email: "alex.johnson@example.com", phone: "5551234567" },
    Shopper { email: "maria.garcia@example.com", phone: "5552345678" },
    Shopper { email: "james.chen@example.com", phone: "5553456789" },
    Shopper { email: "sarah.williams@example.com", phone: "5554567890" },
    Shopper { email: "david.kim@example.com", phone: "5555678901" },
    Shopper { email: "emily.brown@example.com", phone: "5556789012" },
    Shopper { email: "carlos.rivera@example.com", phone: "5557890123" },
    Shopper { email: "priya.patel@example.com", phone: "5558901234" },
];

/// Android, iOS and desktop browsers.
pub const USER_AGENTS: [&str; 12] = [
    "Mozilla/5.0 (Linux; Android 14; Pixel 8 Pro) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.6167.101 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.230 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; SM-A546B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.6167.143 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_3) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.2277.83",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// Public addresses spread across US metros and a few international cities.
pub const IP_POOL: [&str; 17] = [
    "72.229.28.185",
    "98.137.11.164",
    "68.101.56.72",
    "209.95.50.14",
    "67.161.11.225",
    "65.60.160.210",
    "24.30.52.104",
    "71.198.1.42",
    "76.105.132.20",
    "24.150.170.80",
    "98.116.160.50",
    "71.40.128.18",
    "86.149.120.34",
    "126.78.200.12",
    "120.88.60.45",
    "49.37.152.18",
    "103.28.121.70",
];

pub fn random_user_agent<R: Rng>(rng: &mut R) -> &'static str {
    USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0])
}

pub fn random_ip<R: Rng>(rng: &mut R) -> &'static str {
    IP_POOL.choose(rng).copied().unwrap_or(IP_POOL[0])
}

pub fn random_shopper<R: Rng>(rng: &mut R) -> Shopper {
    SHOPPERS.choose(rng).copied().unwrap_or(SHOPPERS[0])
}

/// One to three distinct products.
pub fn random_products<R: Rng>(rng: &mut R) -> Vec<CatalogProduct> {
    let count = rng.gen_range(1..=3);
    PRODUCTS.choose_multiple(rng, count).copied().collect()
}

/// Storefront page an event plausibly originates from.
pub fn event_source_url<R: Rng>(event_name: &EventName, rng: &mut R) -> String {
    let path = match event_name {
        EventName::ViewContent => "/",
        EventName::AddToCart => {
            if rng.gen_bool(0.5) {
                "/"
            } else {
                "/cart"
            }
        }
        EventName::Purchase | EventName::Lead => "/payment",
        EventName::Other(_) => "/",
    };
    format!("{SITE_URL}{path}")
}

fn alphanumeric<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Social-ads click cookie: `fb.1.{unix_ms}.{62 alphanumerics}`.
pub fn random_fbc<R: Rng>(rng: &mut R, now_ms: i64) -> String {
    format!("fb.1.{now_ms}.{}", alphanumeric(rng, 62))
}

/// Short-video click id: 26 alphanumerics.
pub fn random_ttclid<R: Rng>(rng: &mut R) -> String {
    alphanumeric(rng, 26)
}

/// Discussion-platform click id: a 19-digit number.
pub fn random_click_id<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(1_000_000_000_000_000_000u64..10_000_000_000_000_000_000u64)
        .to_string()
}
