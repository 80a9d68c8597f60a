//! Prompt templates for every pipeline stage.
//!
//! Templates are plain `format!` strings; the stored fields they interpolate
//! come straight from the CSV records.

use seopipe_shared::{ClientConfig, ClusterRow};

// ---------------------------------------------------------------------------
// Competitor analysis
// ---------------------------------------------------------------------------

/// System instruction for the analyzer model.
pub fn analysis_instruction(client: &ClientConfig) -> String {
    format!(
        "You work on an SEO team and review blog posts published by competitors.
Open the blog post at the URL you are given and read it. Then report:
- Topic: what the post is about.
- Keywords: the 3 strongest SEO keywords in the post that relate to the competitor's \
business, mixing short-tail and long-tail terms. Every keyword must appear verbatim in the post.
- Summary: short dot points, one per subtopic the post covers. Separate the dot points \
with <br> so the whole summary stays in one table cell.

The competitor is in the {industry} industry and offers: {services}.

Answer with a markdown table and nothing else. It must have exactly three lines: the \
header `| Topic | Keywords | Summary |`, a separator line, and one data line.

Example:
| Topic | Keywords | Summary |
|---|---|---|
| Signs You Need Your Wisdom Teeth Removed | wisdom teeth removal, impacted wisdom teeth, jaw pain | - Wisdom teeth are third molars that erupt in the late teens.<br>- Impaction happens when the jaw has no room.<br>- Pain, swelling and jaw stiffness are warning signs. |",
        industry = client.industry,
        services = client.services,
    )
}

/// User prompt for a single analysis call.
pub fn analysis_request(url: &str) -> String {
    format!("Please analyze the following URL: {url}")
}

// ---------------------------------------------------------------------------
// Keyword planning
// ---------------------------------------------------------------------------

/// First planning stage: brainstorm pillar posts and keyword clusters.
pub fn pillar_plan(client: &ClientConfig) -> String {
    format!(
        "You are on an SEO team that publishes keyword-optimised blog posts every week for \
its clients, so that the client shows up first when their market searches for what they sell.

Your job is to choose the keywords. The team groups related keywords into clusters; each \
cluster becomes one blog post. Related clusters sit under a pillar post that links to every \
post in its group and covers their topics at a high level.

Work through it in this order:
- Start from the client's products and services and their ideal customer.
- List the searches those customers run on Google, including common questions.
- Pick high-volume, highly relevant keywords for each search intent.
- Group the keywords into clusters.
- Group the clusters under pillar posts.

Use this output format:
# Pillar Post 1
## Cluster 1 keywords (dot points)
## Cluster 2 keywords (dot points)
# Pillar Post 2
## Cluster 1 keywords (dot points)
...

The new client is {name}, a {industry} business offering {services}.
Write the keyword plan in the format above.",
        name = client.name,
        industry = client.industry,
        services = client.services,
    )
}

/// Second planning stage: refine the brainstorm with competitor keywords and
/// emit the cluster table.
pub fn refine_into_table(initial_plan: &str, competitor_keywords: &[String]) -> String {
    let competitor_keywords = if competitor_keywords.is_empty() {
        "No specific competitor keywords available.".to_string()
    } else {
        competitor_keywords.join(", ")
    };

    format!(
        "Here is the keyword plan you produced earlier:
--- BEGIN INITIAL PLAN ---
{initial_plan}
--- END INITIAL PLAN ---

A competitor that ranks well is currently targeting these keywords:
Competitor Keywords: {competitor_keywords}
Use them to spot gaps and themes the plan should also cover.

Review the plan and refine it where the competitor keywords suggest improvements.

Your final answer must be ONLY a markdown table with these columns:
- Cluster: the cluster name.
- Intent: what the searcher wants; this sets the topic of the post.
- Keywords: the cluster's keywords, comma-separated.
- Primary Keyword: the single most important keyword; it goes in the post title.

Example:
| Cluster | Intent | Keywords | Primary Keyword |
|---|---|---|---|
| Cosmetic Dentistry Options | People exploring procedures to improve how their smile looks. | smile makeover, teeth whitening, dental veneers | cosmetic dentistry |
| Emergency Dental Care | People with an urgent dental problem who need help today. | emergency dentist, broken tooth repair, same day dentist | emergency dentist |

Do not write anything before or after the table."
    )
}

// ---------------------------------------------------------------------------
// Blog writing
// ---------------------------------------------------------------------------

const TEAM_PREAMBLE: &str = "You are part of a team that writes world class blog posts.";

/// Stage 1: a dot-point outline from the cluster's keywords and intent.
pub fn preliminary_plan(cluster: &ClusterRow) -> String {
    format!(
        "{TEAM_PREAMBLE}

Each project comes with a keyword list, a search intent and a primary keyword:
- Keywords: what the post should rank for. They are spread through the post and define its topic.
- Search intent: why someone searched for these keywords; the post must satisfy it.
- Primary keyword: the most important keyword. It goes in the title and the first sentences, \
so the topic must fit it naturally.

Work out the goal of the post and the flow of its argument, then write a preliminary plan \
as dot points listing the discussion points. The plan must satisfy the search intent, stay \
centred on the keywords, and leave room for every keyword to be used.

Keywords:
{keywords}

Search intent:
{intent}

Primary keyword:
{primary_keyword}

Write the preliminary plan.",
        keywords = cluster.keywords,
        intent = cluster.intent,
        primary_keyword = cluster.primary_keyword,
    )
}

/// System instruction for the online research model.
pub const RESEARCH_INSTRUCTION: &str = "You are a research assistant with web access. Read the \
user's query, search the web for relevant, factual and current information, and write a \
detailed synthesis of what you found: key points, supporting details, statistics and examples. \
Cite sources with bracketed numbers such as [1] and [2] so they can be matched to the citation \
URLs returned with your answer.";

/// The research query: the preliminary plan on one line without double
/// quotes, or a primary-keyword query when the plan is blank.
pub fn research_query(preliminary_plan: &str, primary_keyword: &str) -> String {
    if preliminary_plan.trim().is_empty() {
        let topic = if primary_keyword.trim().is_empty() {
            "general topic"
        } else {
            primary_keyword
        };
        return format!("Provide comprehensive research information about: {topic}");
    }

    preliminary_plan
        .lines()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', " ")
}

/// Stage 3: a detailed section-by-section plan.
pub fn detailed_plan(cluster: &ClusterRow, preliminary_plan: &str, research: &str) -> String {
    format!(
        "{TEAM_PREAMBLE}

You receive the keywords, the primary keyword, the search intent, research findings and a \
preliminary plan. Turn them into a detailed plan for the post:
- Write it as dot points and say which keywords belong in each section. Every keyword must \
be placed somewhere natural.
- Use every research point. Research lines carry source markers written as \
`... - source: URL`; keep those markers exactly as they are.
- Satisfy the search intent and stay centred on the keywords.
- The copywriter is not an expert, so spell out the technical detail of every point: write \
\"define X as ...\" rather than \"define X\".
- Give the plan a logical flow and cover the important concepts in depth.

Keywords:
{keywords}

Search intent:
{intent}

Preliminary plan:
{preliminary_plan}

Research findings:
{research}

Primary keyword:
{primary_keyword}

Output only the detailed plan.",
        keywords = cluster.keywords,
        intent = cluster.intent,
        primary_keyword = cluster.primary_keyword,
    )
}

/// Stage 4: the full draft.
pub fn write_post(detailed_plan: &str, research: &str, primary_keyword: &str) -> String {
    format!(
        "{TEAM_PREAMBLE}
You are the team's lead copywriter. Write the blog post by following the detailed plan \
point by point.

The post must:
- Use short paragraphs, bullet points and keyword-bearing subheadings.
- Be dense with value and free of filler.
- Use the keywords assigned to each section inside that section.
- Use the research as the plan directs. Keep every ` - source: URL` marker exactly as written; \
they become links later.
- Put the primary keyword '{primary_keyword}' in the title, the H1 and early in the introduction.
- Use synonyms and related terms of the keywords where they fit.
- Run to at least 2000 words and read at a year 5 level.

Write the whole post in one go.

Detailed plan:
{detailed_plan}

Research findings:
{research}

Primary keyword:
{primary_keyword}

Write the blog post."
    )
}

/// Stage 5: weave links to published posts into the draft.
pub fn internal_links(draft: &str, published_posts: &str) -> String {
    format!(
        "{TEAM_PREAMBLE}
You handle internal linking.

Below are a DRAFT post and a list of posts already PUBLISHED on our site, each with its URL, \
topic, keywords and summary.

1. Find at least two places where a published post is genuinely relevant to a passage in \
the draft. Do not force links.
2. Insert the published post's URL right next to the phrase it belongs to, for example: \
\"...a key concept [https://example.com/post] worth reading about.\"
3. Do not remove or change anything else, including existing source URLs. Only add links.

Return the complete revised draft and nothing else.

DRAFT:
{draft}

PUBLISHED posts:
{published_posts}"
    )
}

/// Stage 6: convert the linked draft to a single HTML document.
pub fn html_conversion(post: &str) -> String {
    format!(
        "You are an HTML developer who formats blog posts for WordPress. Convert the blog \
post below into one HTML fragment:
1. Wrap everything in a `<div style=\"background-color: #333333; color: #ffffff; \
font-family: Arial, sans-serif; line-height: 1.6; padding: 20px;\">`.
2. Inside it, add `<style> p, .wp-block-paragraph, ul.wp-block-list, li {{ color: #ffffff \
!important; font-size: 20px !important; }} a {{ color: #00c2ff !important; text-decoration: \
underline !important; }} </style>`.
3. Turn every URL into an `<a>` tag. When a URL follows a phrase (`phrase - source: URL` or \
`phrase [URL]`), the phrase becomes the link text; a standalone URL gets `[source]` as its text.
4. Use H1 for the title and H2/H3 for sections, each with `style=\"border-bottom: 2px solid \
#00c2ff; padding-bottom: 5px; color: #ffffff;\"` and an `id` slug.
5. Use `<p>` for paragraphs, `<ul>`/`<li>` for lists and `<br><br>` between major sections. \
Format Key Takeaways, Table of Contents (linking to heading ids) and FAQ sections as H2 plus \
a list or question/answer pairs.
6. No emojis.
7. Output only the HTML, without markdown code fences.

Blog post:
{post}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_query_flattens_plan() {
        let plan = "- Intro to \"veneers\"\n- Costs\n- Aftercare";
        assert_eq!(
            research_query(plan, "veneers"),
            "- Intro to  veneers  - Costs - Aftercare"
        );
    }

    #[test]
    fn research_query_falls_back_to_keyword() {
        assert_eq!(
            research_query("  \n ", "dental implants"),
            "Provide comprehensive research information about: dental implants"
        );
        assert_eq!(
            research_query("", ""),
            "Provide comprehensive research information about: general topic"
        );
    }

    #[test]
    fn refine_prompt_embeds_plan_and_keywords() {
        let prompt = refine_into_table("# Pillar 1", &["implants".into(), "veneers".into()]);
        assert!(prompt.contains("# Pillar 1"));
        assert!(prompt.contains("Competitor Keywords: implants, veneers"));

        let prompt = refine_into_table("# Pillar 1", &[]);
        assert!(prompt.contains("No specific competitor keywords available."));
    }

    #[test]
    fn client_details_reach_prompts() {
        let client = ClientConfig::default();
        assert!(pillar_plan(&client).contains(&client.name));
        assert!(analysis_instruction(&client).contains(&client.services));
    }

    #[test]
    fn cluster_fields_reach_prompts() {
        let cluster = ClusterRow {
            cluster: "Implants".into(),
            intent: "Compare tooth replacement options".into(),
            keywords: "implants, bridges".into(),
            primary_keyword: "dental implants".into(),
            ..Default::default()
        };
        let prompt = preliminary_plan(&cluster);
        assert!(prompt.contains("Compare tooth replacement options"));
        assert!(prompt.contains("implants, bridges"));

        let prompt = detailed_plan(&cluster, "PRELIM", "RESEARCH");
        assert!(prompt.contains("PRELIM") && prompt.contains("RESEARCH"));
        assert!(write_post("PLAN", "R", "dental implants").contains("'dental implants'"));
    }
}
