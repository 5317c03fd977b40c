use tinyorm::{DbResult, Gateway, SqliteGateway};
use tinyorm_derive::Entity;
use tracing_subscriber::EnvFilter;

#[derive(Entity, Debug, Clone)]
#[table = "departments"]
struct Department {
    #[index]
    pub name: String,
    pub location: String,
}

fn main() -> DbResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut departments = Department::mapper(SqliteGateway::open_in_memory()?);
    departments.create_table()?;

    init_example_data(&mut departments)?;

    let payroll = departments
        .find_by_name("Payroll".to_owned())?
        .expect("seeded above");
    println!("Found: {}", payroll.borrow());

    payroll.borrow_mut().data.location = "Building B".to_owned();
    departments.update(&payroll)?;

    println!("All departments:");
    for department in departments.find_all()? {
        println!("  {}", department.borrow());
    }

    departments.delete(&payroll)?;
    println!("Deleted: {}", payroll.borrow());

    Ok(())
}

fn init_example_data<G: Gateway>(departments: &mut DepartmentMapper<G>) -> DbResult<()> {
    for (name, location) in [
        ("Payroll", "Building A"),
        ("Human Resources", "Building C"),
        ("Accounting", "Building D"),
    ] {
        departments.create(Department {
            name: name.to_owned(),
            location: location.to_owned(),
        })?;
    }

    Ok(())
}
