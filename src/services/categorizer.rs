//! Domain extraction and category classification.
//!
//! Classification is a first-match-wins linear scan over an ordered table of
//! `(Category, Matcher)` rules tested against the bare domain, with an
//! ordered path-pattern fallback that maps news/blog-looking URLs to
//! [`Category::News`]. Rule order is a correctness invariant: `work` claims
//! productivity subdomains (e.g. `docs.google.com`) before the generic
//! `search` rule can see them.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::trace;
use url::Url;

use crate::models::analytics::Category;

/// Sentinel domain for URLs that cannot be parsed. Keeps
/// [`extract_domain`] total: callers always get a groupable key.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// A single domain rule. `DomainExcluding` expresses "matches the pattern
/// but none of these subdomains" without regex lookaround, which the
/// `regex` crate does not support.
enum Matcher {
    Domain(Regex),
    DomainExcluding {
        pattern: Regex,
        exclusions: &'static [&'static str],
    },
}

impl Matcher {
    fn matches(&self, domain: &str) -> bool {
        match self {
            Matcher::Domain(pattern) => pattern.is_match(domain),
            Matcher::DomainExcluding {
                pattern,
                exclusions,
            } => pattern.is_match(domain) && !exclusions.iter().any(|sub| domain.contains(sub)),
        }
    }
}

const WORK_PATTERNS: &[&str] = &[
    r"github\.com",
    r"gitlab\.com",
    r"bitbucket\.org",
    r"stackoverflow\.com",
    r"stackexchange\.com",
    r"slack\.com",
    r"notion\.so",
    r"notion\.com",
    r"trello\.com",
    r"asana\.com",
    r"monday\.com",
    r"jira\.",
    r"atlassian\.",
    r"confluence\.",
    r"docs\.google\.com",
    r"sheets\.google\.com",
    r"slides\.google\.com",
    r"drive\.google\.com",
    r"calendar\.google\.com",
    r"mail\.google\.com",
    r"outlook\.",
    r"office\.com",
    r"linkedin\.com",
    r"zoom\.us",
    r"meet\.google\.com",
    r"teams\.microsoft\.com",
    r"figma\.com",
    r"canva\.com",
    r"miro\.com",
    r"vercel\.com",
    r"netlify\.com",
    r"heroku\.com",
    r"digitalocean\.com",
    r"aws\.amazon\.com",
    r"console\.cloud\.google",
    r"azure\.microsoft\.com",
    r"codepen\.io",
    r"codesandbox\.io",
    r"replit\.com",
    r"npmjs\.com",
    r"packagist\.org",
    r"pypi\.org",
    r"medium\.com",
    r"dev\.to",
    r"hashnode\.com",
    r"coursera\.org",
    r"udemy\.com",
    r"skillshare\.com",
    r"pluralsight\.com",
    r"egghead\.io",
    r"frontendmasters\.com",
    r"w3schools\.com",
    r"mdn\.mozilla",
    r"developer\.mozilla",
    r"freecodecamp\.org",
];

const SOCIAL_PATTERNS: &[&str] = &[
    r"facebook\.com",
    r"fb\.com",
    r"twitter\.com",
    // Word boundary keeps this from matching hosts that merely end in "x",
    // e.g. netflix.com.
    r"\bx\.com",
    r"instagram\.com",
    r"tiktok\.com",
    r"snapchat\.com",
    r"reddit\.com",
    r"discord\.com",
    r"discord\.gg",
    r"telegram\.org",
    r"t\.me",
    r"web\.telegram",
    r"whatsapp\.com",
    r"messenger\.com",
    r"pinterest\.com",
    r"tumblr\.com",
    r"threads\.net",
    r"mastodon\.",
    r"bsky\.app",
    r"quora\.com",
    r"vk\.com",
    r"ok\.ru",
];

const ENTERTAINMENT_PATTERNS: &[&str] = &[
    r"youtube\.com",
    r"youtu\.be",
    r"netflix\.com",
    r"hulu\.com",
    r"disneyplus\.com",
    r"disney\+",
    r"twitch\.tv",
    r"spotify\.com",
    r"open\.spotify",
    r"soundcloud\.com",
    r"hbomax\.com",
    r"max\.com",
    r"primevideo\.com",
    r"amazon\.com/Prime-Video",
    r"crunchyroll\.com",
    r"vimeo\.com",
    r"dailymotion\.com",
    r"gaming\.",
    r"ign\.com",
    r"gamespot\.com",
    r"kotaku\.com",
    r"polygon\.com",
    r"steampowered\.com",
    r"store\.steampowered",
    r"epicgames\.com",
    r"gog\.com",
    r"twitch\.tv",
    r"mixer\.com",
    r"kick\.com",
    r"9gag\.com",
    r"imgur\.com",
    r"giphy\.com",
    r"tenor\.com",
    r"tubi\.tv",
    r"pluto\.tv",
    r"peacocktv\.com",
    r"apple\.com/tv",
    r"music\.apple",
    r"music\.youtube",
    r"deezer\.com",
    r"tidal\.com",
    r"pandora\.com",
];

const SHOPPING_PATTERNS: &[&str] = &[
    r"amazon\.",
    r"ebay\.",
    r"etsy\.com",
    r"walmart\.com",
    r"target\.com",
    r"bestbuy\.com",
    r"aliexpress\.com",
    r"alibaba\.com",
    r"shopify\.com",
    r"wish\.com",
    r"shein\.com",
    r"asos\.com",
    r"zara\.com",
    r"hm\.com",
    r"uniqlo\.com",
    r"nike\.com",
    r"adidas\.com",
    r"prom\.ua",
    r"rozetka\.com\.ua",
    r"olx\.ua",
    r"allo\.ua",
    r"comfy\.ua",
    r"epicentrk\.ua",
    r"makeup\.com\.ua",
    r"citrus\.ua",
    r"moyo\.ua",
    r"foxtrot\.com\.ua",
    r"hotline\.ua",
    r"price\.ua",
    r"zakupki\.prom\.ua",
];

const NEWS_DOMAIN_PATTERNS: &[&str] = &[
    r"news\.",
    r"blog\.",
    r"article\.",
    r"news-post\.",
    r"cnn\.com",
    r"bbc\.",
    r"bbc\.co\.uk",
    r"nytimes\.com",
    r"theguardian\.com",
    r"reuters\.com",
    r"bloomberg\.com",
    r"techcrunch\.com",
    r"theverge\.com",
    r"wired\.com",
    r"arstechnica\.com",
    r"engadget\.com",
    r"mashable\.com",
    r"gizmodo\.com",
    r"lifehacker\.com",
    r"vice\.com",
    r"vox\.com",
    r"buzzfeed\.com",
    r"huffpost\.com",
    r"washingtonpost\.com",
    r"wsj\.com",
    r"forbes\.com",
    r"businessinsider\.com",
    r"insider\.com",
    r"cnbc\.com",
    r"foxnews\.com",
    r"nbcnews\.com",
    r"abcnews\.go\.com",
    r"apnews\.com",
    r"axios\.com",
    r"politico\.com",
    r"thehill\.com",
    // Ukrainian news
    r"pravda\.com\.ua",
    r"ukrainska-pravda",
    r"ukr\.net",
    r"unian\.ua",
    r"unian\.net",
    r"obozrevatel\.com",
    r"tsn\.ua",
    r"korrespondent\.net",
    r"liga\.net",
    r"nv\.ua",
    r"espreso\.tv",
    r"hromadske\.ua",
    r"zn\.ua",
    r"detector\.media",
    r"babel\.ua",
    r"focus\.ua",
    r"gazeta\.ua",
    r"censor\.net",
    r"24tv\.ua",
    r"segodnya\.ua",
    r"ukrinform\.ua",
    r"interfax\.com\.ua",
    r"rbc\.ua",
    r"epravda\.com\.ua",
];

const SEARCH_PATTERNS: &[&str] = &[
    r"bing\.com",
    r"duckduckgo\.com",
    r"yahoo\.com/search",
    r"ecosia\.org",
    r"brave\.com/search",
    r"yandex\.",
    r"baidu\.com",
];

/// Google productivity subdomains excluded from the generic search rule.
/// These belong to `work` even though the host also matches `google.com`.
const SEARCH_GOOGLE_EXCLUSIONS: &[&str] = &[
    "docs.google.com",
    "sheets.google.com",
    "drive.google.com",
    "calendar.google.com",
    "mail.google.com",
    "meet.google.com",
];

const FINANCE_PATTERNS: &[&str] = &[
    r"paypal\.com",
    r"stripe\.com",
    r"revolut\.com",
    r"wise\.com",
    r"privatbank\.ua",
    r"monobank\.ua",
    r"oschadbank\.ua",
    r"binance\.com",
    r"coinbase\.com",
    r"kraken\.com",
    r"blockchain\.com",
    r"tradingview\.com",
    r"investing\.com",
    r"finance\.yahoo",
    r"marketwatch\.com",
    r"robinhood\.com",
    r"etoro\.com",
];

const EDUCATION_PATTERNS: &[&str] = &[
    r"wikipedia\.org",
    r"wikimedia\.org",
    r"khanacademy\.org",
    r"duolingo\.com",
    r"quizlet\.com",
    r"brainly\.com",
    r"chegg\.com",
    r"studocu\.com",
    r"academia\.edu",
    r"researchgate\.net",
    r"scholar\.google",
    r"arxiv\.org",
    r"jstor\.org",
    r"britannica\.com",
    r"ted\.com",
    r"edx\.org",
    r"leetcode\.com",
    r"hackerrank\.com",
    r"codewars\.com",
    r"exercism\.org",
];

const AI_PATTERNS: &[&str] = &[
    r"chat\.openai\.com",
    r"openai\.com",
    r"claude\.ai",
    r"anthropic\.com",
    r"bard\.google",
    r"gemini\.google",
    r"perplexity\.ai",
    r"midjourney\.com",
    r"stability\.ai",
    r"huggingface\.co",
    r"replicate\.com",
    r"poe\.com",
    r"character\.ai",
    r"copilot\.microsoft",
    r"github\.com/copilot",
];

/// URL path patterns for news/blog/article detection. Tested against
/// `pathname + search` only when no domain rule matched.
const NEWS_PATH_PATTERNS: &[&str] = &[
    // Blog patterns
    r"/blog/",
    r"/blogs/",
    r"/weblog/",
    // News patterns
    r"/news/",
    r"/news-",
    r"/breaking/",
    r"/latest/",
    r"/headlines/",
    r"/press/",
    r"/press-release",
    r"/media/",
    r"/newsroom/",
    // Article patterns
    r"/article/",
    r"/articles/",
    r"/story/",
    r"/stories/",
    r"/post/",
    r"/posts/",
    r"/read/",
    // Release/Update patterns
    r"/releases/",
    r"/release/",
    r"/changelog/",
    r"/updates/",
    r"/update/",
    r"/whats-new",
    r"/announcements?/",
    // Editorial patterns
    r"/editorial/",
    r"/opinion/",
    r"/perspectives?/",
    r"/insights?/",
    r"/analysis/",
    r"/reports?/",
    r"/review/",
    r"/reviews/",
    // Publication patterns
    r"/publication/",
    r"/publications/",
    r"/journal/",
    r"/magazine/",
    r"/digest/",
    // Date-based article URLs (common pattern: /2026/01/article-name)
    r"/\d{4}/\d{1,2}/[a-z0-9-]+",
    // Content type indicators
    r"/content/",
    r"/featured/",
    r"/trending/",
    r"/popular/",
    r"/spotlight/",
    // Tech/Dev specific
    r"/devblog/",
    r"/engineering/",
    r"/tech-blog/",
    r"/developer-blog/",
    // Company blog patterns
    r"/company-news/",
    r"/corporate/",
    r"/about/news",
    // Newsletter patterns
    r"/newsletter/",
    r"/subscribe/",
];

/// Ordered rule table. Categories are scanned in declaration order and
/// patterns in declaration order within a category; the first hit wins.
static DOMAIN_RULES: Lazy<Vec<(Category, Vec<Matcher>)>> = Lazy::new(|| {
    vec![
        (Category::Work, compile_matchers(WORK_PATTERNS)),
        (Category::Social, compile_matchers(SOCIAL_PATTERNS)),
        (
            Category::Entertainment,
            compile_matchers(ENTERTAINMENT_PATTERNS),
        ),
        (Category::Shopping, compile_matchers(SHOPPING_PATTERNS)),
        (Category::News, compile_matchers(NEWS_DOMAIN_PATTERNS)),
        (Category::Search, search_matchers()),
        (Category::Finance, compile_matchers(FINANCE_PATTERNS)),
        (Category::Education, compile_matchers(EDUCATION_PATTERNS)),
        (Category::Ai, compile_matchers(AI_PATTERNS)),
    ]
});

static PATH_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    NEWS_PATH_PATTERNS
        .iter()
        .map(|pattern| compile_pattern(pattern))
        .collect()
});

fn compile_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("category pattern must compile")
}

fn compile_matchers(patterns: &[&str]) -> Vec<Matcher> {
    patterns
        .iter()
        .map(|pattern| Matcher::Domain(compile_pattern(pattern)))
        .collect()
}

fn search_matchers() -> Vec<Matcher> {
    let mut matchers = vec![Matcher::DomainExcluding {
        pattern: compile_pattern(r"google\.com"),
        exclusions: SEARCH_GOOGLE_EXCLUSIONS,
    }];
    matchers.extend(compile_matchers(SEARCH_PATTERNS));
    matchers
}

/// Extract the normalized registrable domain from a URL: the host with a
/// leading `www.` stripped. Returns [`UNKNOWN_DOMAIN`] on malformed input
/// instead of failing.
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url).ok().and_then(|parsed| {
        parsed
            .host_str()
            .map(|host| host.trim_start_matches("www.").to_string())
    }) {
        Some(domain) => domain,
        None => {
            trace!(target: "app::categorize", %url, "unparseable url, using sentinel domain");
            UNKNOWN_DOMAIN.to_string()
        }
    }
}

/// Map a `(domain, url)` pair to exactly one category. Pure: same inputs
/// always yield the same label.
pub fn categorize(domain: &str, url: &str) -> Category {
    for (category, matchers) in DOMAIN_RULES.iter() {
        if matchers.iter().any(|matcher| matcher.matches(domain)) {
            return *category;
        }
    }

    // Path fallback for sites the domain tables do not know about.
    if !url.is_empty() && is_news_path(url) {
        return Category::News;
    }

    Category::Other
}

/// Check `pathname + search` of a URL against the news-path table. A URL
/// that cannot be parsed is simply not a news path.
fn is_news_path(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    let full_path = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };

    PATH_RULES.iter().any(|pattern| pattern.is_match(&full_path))
}
