// LLM prompts for the Content Generator.

/// System prompt for LaTeX resume generation.
pub const RESUME_SYSTEM: &str = "You are an expert resume writer and LaTeX specialist. \
Your task is to generate a professional, ATS-optimized resume in LaTeX format using the moderncv class.

IMPORTANT REQUIREMENTS:
1. Return ONLY valid LaTeX code - no explanations, no markdown formatting
2. Use the moderncv document class with appropriate packages
3. Structure the content to be ATS-friendly with clear sections
4. Tailor the content to match the provided job description
5. Use professional formatting and appropriate fonts
6. Include all provided information without making up details
7. Optimize for both human readability and ATS parsing

The resume should include these sections in order:
- Personal Information (name, email, phone, location, LinkedIn, GitHub)
- Professional Summary (if provided)
- Skills (organized by category when possible)
- Work Experience (reverse chronological order)
- Education
- Projects (if provided)
- Certifications (if provided)
- Languages (if provided)";

/// Resume generation prompt. Arguments are inserted in a single pass, so
/// braces inside user text are never re-expanded.
pub fn resume_prompt(resume_data: &str, job_description: &str, template_style: &str) -> String {
    format!(
        r#"Generate a professional resume in LaTeX format (moderncv class) using this information:

RESUME DATA:
{resume_data}

JOB DESCRIPTION TO TAILOR AGAINST:
{job_description}

TEMPLATE STYLE: {template_style}

Please create an ATS-optimized resume that:
1. Highlights relevant skills and experience for this specific job
2. Uses appropriate keywords from the job description
3. Maintains professional formatting
4. Is optimized for both ATS systems and human reviewers

Return only the complete LaTeX document code."#
    )
}
