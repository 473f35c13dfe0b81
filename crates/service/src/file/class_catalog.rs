use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs;
use tracing::{info, warn};

use crate::errors::ServiceError;

/// One registrable class within a grade.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default = "default_class_type")]
    pub kind: String,
}

fn default_class_type() -> String {
    "general".into()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grade {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
}

/// School-wide settings. UI texts are kept as an opaque JSON map.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SchoolSettings {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub event_title: String,
    #[serde(default)]
    pub default_password: Option<String>,
    #[serde(default)]
    pub texts: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogData {
    #[serde(default)]
    pub grades: IndexMap<String, Grade>,
    #[serde(default)]
    pub settings: SchoolSettings,
}

/// A class together with the grade it belongs to.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub code: String,
    pub kind: String,
    pub grade_name: String,
    pub grade_color: String,
}

/// File-backed catalog of the classes open for registration.
///
/// Grades are keyed by name and iterated in the order the file declares them.
#[derive(Clone, Debug)]
pub struct ClassCatalog {
    data: CatalogData,
    file_path: PathBuf,
}

impl ClassCatalog {
    /// Load the catalog from `path`. A missing or unreadable file falls back
    /// to the built-in catalog; the file is not created until `save`.
    pub async fn load<P: Into<PathBuf>>(path: P) -> Self {
        let file_path = path.into();
        let data = match fs::read(&file_path).await {
            Ok(bytes) => match serde_json::from_slice::<CatalogData>(&bytes) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "invalid class catalog, using defaults");
                    CatalogData::builtin()
                }
            },
            Err(_) => {
                info!(path = %file_path.display(), "class catalog not found, using defaults");
                CatalogData::builtin()
            }
        };
        Self { data, file_path }
    }

    /// Build a catalog from in-memory data bound to `path` for later saves.
    pub fn from_data<P: Into<PathBuf>>(path: P, data: CatalogData) -> Self {
        Self { data, file_path: path.into() }
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    pub fn all_grades(&self) -> &IndexMap<String, Grade> {
        &self.data.grades
    }

    /// Flat list of class names, grades and classes both as declared.
    pub fn all_class_names(&self) -> Vec<String> {
        self.data
            .grades
            .values()
            .flat_map(|g| g.classes.iter().map(|c| c.name.clone()))
            .collect()
    }

    pub fn classes_by_grade(&self, grade_name: &str) -> &[ClassEntry] {
        self.data.grades.get(grade_name).map(|g| g.classes.as_slice()).unwrap_or(&[])
    }

    pub fn class_info(&self, class_name: &str) -> Option<ClassInfo> {
        self.data.grades.values().find_map(|grade| {
            grade.classes.iter().find(|c| c.name == class_name).map(|c| ClassInfo {
                name: c.name.clone(),
                code: c.code.clone(),
                kind: c.kind.clone(),
                grade_name: grade.name.clone(),
                grade_color: grade.color.clone(),
            })
        })
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.data.grades.values().any(|g| g.classes.iter().any(|c| c.name == class_name))
    }

    pub fn settings(&self) -> &SchoolSettings {
        &self.data.settings
    }

    /// Persist the catalog as pretty JSON.
    pub async fn save(&self) -> Result<(), ServiceError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| ServiceError::Catalog(e.to_string()))?;
        }
        let data = serde_json::to_vec_pretty(&self.data).map_err(|e| ServiceError::Catalog(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Catalog(e.to_string()))?;
        Ok(())
    }

    /// Append a class to an existing grade and save. Returns `false` for an
    /// unknown grade. A missing code is derived from the name.
    pub async fn add_class_to_grade(
        &mut self,
        grade_name: &str,
        class_name: &str,
        class_code: Option<&str>,
        class_type: &str,
    ) -> Result<bool, ServiceError> {
        let Some(grade) = self.data.grades.get_mut(grade_name) else {
            return Ok(false);
        };
        let code = match class_code {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => derive_code(class_name),
        };
        grade.classes.push(ClassEntry { name: class_name.to_string(), code, kind: class_type.to_string() });
        self.save().await?;
        Ok(true)
    }

    /// Remove every class named `class_name` from a grade and save.
    /// Returns `false` for an unknown grade.
    pub async fn remove_class_from_grade(&mut self, grade_name: &str, class_name: &str) -> Result<bool, ServiceError> {
        let Some(grade) = self.data.grades.get_mut(grade_name) else {
            return Ok(false);
        };
        grade.classes.retain(|c| c.name != class_name);
        self.save().await?;
        Ok(true)
    }
}

fn builtin_grade(name: &str, color: &str, prefix: &str, grade_no: u8, letters: &[(&str, &str)]) -> (String, Grade) {
    let classes = letters
        .iter()
        .map(|(letter, code)| ClassEntry {
            name: format!("{prefix} \"{letter}\""),
            code: format!("{grade_no}-{code}"),
            kind: "section".into(),
        })
        .collect();
    (name.to_string(), Grade { name: name.to_string(), color: color.to_string(), classes })
}

fn derive_code(class_name: &str) -> String {
    class_name.to_lowercase().replace(' ', "-").replace('"', "")
}

impl CatalogData {
    /// Catalog used when no configuration file is available.
    pub fn builtin() -> Self {
        let grades = IndexMap::from([
            builtin_grade(
                "طبقة الروابع",
                "linear-gradient(135deg, #3498db 0%, #2980b9 100%)",
                "الرابع",
                4,
                &[("أ", "a"), ("ب", "b"), ("ج", "c"), ("د", "d"), ("هـ", "e")],
            ),
            builtin_grade(
                "طبقة الخوامس",
                "linear-gradient(135deg, #8e44ad 0%, #9b59b6 100%)",
                "الخامس",
                5,
                &[("أ", "a"), ("ب", "b"), ("ج", "c"), ("د", "d")],
            ),
            builtin_grade(
                "طبقة السوادس",
                "linear-gradient(135deg, #27ae60 0%, #2ecc71 100%)",
                "السادس",
                6,
                &[("أ", "a"), ("ب", "b"), ("ج", "c"), ("د", "d"), ("هـ", "e")],
            ),
        ]);
        let settings = SchoolSettings {
            school_name: "المدرسة الجماهيرية بئر الأمير - الناصرة".into(),
            event_title: "اجتماع أهالي طلاب الصفوف الثالثة وحتى السادسة".into(),
            default_password: Some("admin123".into()),
            texts: json!({
                "registration_welcome": "أهلاً وسهلاً بكم في تسجيل الحضور",
                "registration_instructions": "يرجى إدخال اسم الطالب واختيار الصف",
                "student_name_label": "اسم الطالب",
                "class_name_label": "الصف",
                "register_button": "تسجيل الحضور",
                "qr_code_title": "رمز QR للتسجيل",
                "qr_code_instructions": "امسح هذا الرمز للوصول إلى صفحة التسجيل",
                "management_title": "إدارة الطلاب",
                "add_student": "إضافة طالب جديد",
                "remove_student": "حذف طالب",
                "refresh_data": "تحديث البيانات",
                "class_selection": "اختيار الصف",
                "student_list": "قائمة الطلاب",
                "no_students": "لا يوجد طلاب في هذا الصف",
                "password_required": "كلمة المرور مطلوبة لحذف الطلاب",
                "total_students": "إجمالي الطلاب المسجلين",
                "students_count": "طالب",
                "success_messages": {
                    "student_added": "تم إضافة الطالب بنجاح",
                    "student_removed": "تم حذف الطالب بنجاح",
                    "registration_success": "تم التسجيل بنجاح"
                },
                "error_messages": {
                    "invalid_class": "الصف غير صحيح",
                    "missing_data": "الرجاء إدخال جميع البيانات المطلوبة",
                    "wrong_password": "كلمة المرور غير صحيحة",
                    "student_exists": "الطالب مسجل بالفعل",
                    "connection_error": "خطأ في الاتصال بالخادم"
                }
            }),
        };
        Self { grades, settings }
    }
}
