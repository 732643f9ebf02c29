use super::LanguageId;

crate::define_id_enum! {
    /// Application frameworks the detector can recognize
    FrameworkId {
        Flask => "flask" : "Flask",
        Django => "django" : "Django",
        FastApi => "fastapi" : "FastAPI",
        Express => "express" : "Express" | "Express.js",
        NestJs => "nestjs" : "NestJS",
        SpringBoot => "spring-boot" : "Spring Boot",
        Gin => "gin" : "Gin",
        Unknown => "unknown" : "Unknown",
    }
}

impl FrameworkId {
    /// Runtime language implied by the framework.
    pub fn language(&self) -> LanguageId {
        match self {
            FrameworkId::Flask | FrameworkId::Django | FrameworkId::FastApi => LanguageId::Python,
            FrameworkId::Express | FrameworkId::NestJs => LanguageId::NodeJs,
            FrameworkId::SpringBoot => LanguageId::Java,
            FrameworkId::Gin => LanguageId::Go,
            FrameworkId::Unknown => LanguageId::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FrameworkId::Flask => "Lightweight Python WSGI web application framework",
            FrameworkId::Django => "High-level Python web framework",
            FrameworkId::FastApi => "Modern, fast Python API framework",
            FrameworkId::Express => "Fast, unopinionated Node.js web framework",
            FrameworkId::NestJs => "Progressive Node.js framework",
            FrameworkId::SpringBoot => "Java framework for stand-alone services",
            FrameworkId::Gin => "HTTP web framework for Go",
            FrameworkId::Unknown => "No framework could be identified",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FrameworkId::Unknown)
    }

    /// Every recognizable framework, excluding the `Unknown` sentinel.
    pub fn known() -> impl Iterator<Item = FrameworkId> {
        Self::all_variants()
            .iter()
            .copied()
            .filter(|id| !id.is_unknown())
    }
}
