use crate::api::{
    checkin::CheckinRequest,
    employee::{CreateEmployee, EmployeeListResponse},
    branch::CreateBranch,
    incident::CreateIncident,
    schedule::CreateSchedule,
    template::{EnrollTemplate, IdentifyRequest, IdentifyResponse},
    zone::SaveZone,
};
use crate::auth::handlers::TokenPair;
use crate::model::{
    attendance::{AttendanceAction, AttendanceEvent},
    branch::Branch,
    department::{Department, JobRole},
    employee::{Employee, EmployeeSummary},
    employee_log::EmployeeLog,
    face_template::FaceTemplateInfo,
    incident::{Incident, IncidentKind},
    schedule::Schedule,
    zone::Zone,
};
use crate::models::{LoginReqDto, RegisterReq};
use crate::recognition::{Candidate, Confidence, GeofenceVerdict, RejectReason};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Face Attendance API",
        version = "1.0.0",
        description = r#"
## Face-recognition attendance

Kiosks capture face descriptors in the browser and send them here. The
service matches them against enrolled templates, then records the next
check-in or check-out for the identified employee.

### Key Features
- **Identification**: nearest-template matching with a distance threshold,
  ranked candidates on every answer
- **Geofence**: per-branch circular zone checks for the kiosk location
- **Administration**: employees, branches, zones, schedules, incidents and an
  employee audit log

### Security
Everything under `/api` requires a JWT Bearer access token. Kiosk accounts
may identify; supervisors and admins manage records.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::template::identify,
        crate::api::template::enroll_template,
        crate::api::template::list_employee_templates,

        crate::api::checkin::check_location,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::branch::list_branches,
        crate::api::branch::create_branch,
        crate::api::branch::delete_branch,

        crate::api::zone::get_zone,
        crate::api::zone::save_zone,

        crate::api::schedule::create_schedule,
        crate::api::schedule::list_employee_schedules,
        crate::api::schedule::delete_schedule,

        crate::api::incident::create_incident,
        crate::api::incident::list_incidents,

        crate::api::attendance::list_attendance,
        crate::api::logs::list_employee_logs,

        crate::api::catalog::list_departments,
        crate::api::catalog::list_roles
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            IdentifyRequest,
            IdentifyResponse,
            EnrollTemplate,
            Candidate,
            Confidence,
            RejectReason,
            CheckinRequest,
            GeofenceVerdict,
            CreateEmployee,
            Employee,
            EmployeeSummary,
            EmployeeListResponse,
            CreateBranch,
            Branch,
            SaveZone,
            Zone,
            CreateSchedule,
            Schedule,
            CreateIncident,
            Incident,
            IncidentKind,
            AttendanceAction,
            AttendanceEvent,
            EmployeeLog,
            FaceTemplateInfo,
            Department,
            JobRole
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Recognition", description = "Face template enrollment and identification"),
        (name = "Geofence", description = "Branch zones and location checks"),
        (name = "Employee", description = "Employee management"),
        (name = "Branch", description = "Branch management"),
        (name = "Schedule", description = "Weekly work schedules"),
        (name = "Incident", description = "Attendance incidents"),
        (name = "Attendance", description = "Recorded check-ins and check-outs"),
        (name = "Audit", description = "Employee change log"),
        (name = "Catalog", description = "Departments and job roles"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
