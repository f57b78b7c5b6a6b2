use rand::Rng;

const CHROME_VERSIONS: [&str; 12] = [
    "133.0.6943.88",
    "133.0.6943.60",
    "132.0.6834.110",
    "132.0.6834.83",
    "131.0.6778.108",
    "131.0.6778.85",
    "130.0.6723.117",
    "129.0.6668.89",
    "128.0.6613.138",
    "127.0.6533.119",
    "126.0.6478.182",
    "125.0.6422.176",
];

const FIREFOX_VERSIONS: [&str; 8] = [
    "133.0", "132.0", "131.0", "130.0", "129.0", "128.0", "127.0", "126.0",
];

const EDGE_VERSIONS: [&str; 6] = [
    "133.0.3048.56",
    "132.0.2957.63",
    "131.0.2903.112",
    "130.0.2849.80",
    "129.0.2792.65",
    "128.0.2739.90",
];

/// Desktop platforms only; some quote pages serve a stripped mobile layout
/// (or block the request) for anything else.
const DESKTOP_OS: [&str; 8] = [
    "Windows NT 10.0; Win64; x64",
    "Windows NT 11.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 14_2_1",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
    "X11; Fedora; Linux x86_64",
    "X11; Linux aarch64",
];

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn gen_chrome_ua(rng: &mut impl Rng) -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        pick(rng, &DESKTOP_OS),
        pick(rng, &CHROME_VERSIONS)
    )
}

fn gen_firefox_ua(rng: &mut impl Rng) -> String {
    let version = pick(rng, &FIREFOX_VERSIONS);
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        pick(rng, &DESKTOP_OS),
        version,
        version
    )
}

fn gen_edge_ua(rng: &mut impl Rng) -> String {
    let version = pick(rng, &EDGE_VERSIONS);
    let chrome = version.split('.').next().unwrap_or("133");
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
        pick(rng, &DESKTOP_OS[..4]),
        chrome,
        version
    )
}

/// Returns a plausible desktop browser User-Agent, weighted towards Chrome.
pub fn gen_desktop_ua() -> String {
    let mut rng = rand::rng();
    match rng.random_range(0..10) {
        0..=5 => gen_chrome_ua(&mut rng),
        6..=8 => gen_firefox_ua(&mut rng),
        _ => gen_edge_ua(&mut rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ua_formats() {
        for _ in 0..100 {
            let ua = gen_desktop_ua();
            assert!(ua.starts_with("Mozilla/5.0 ("), "{}", ua);
            assert!(!ua.contains("Mobile"), "{}", ua);
            assert!(
                DESKTOP_OS.iter().any(|os| ua.contains(os)),
                "unexpected platform: {}",
                ua
            );
        }
    }

    #[test]
    fn test_edge_reports_matching_chrome_major() {
        let mut rng = rand::rng();
        let ua = gen_edge_ua(&mut rng);
        let edg = ua.rsplit("Edg/").next().unwrap();
        let major = edg.split('.').next().unwrap();
        assert!(ua.contains(&format!("Chrome/{}.0.0.0", major)), "{}", ua);
    }
}
